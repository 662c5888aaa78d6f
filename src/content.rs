use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::boilerplate::BoilerplateFilter;
use crate::config::{ExtractionThresholds, ScoringWeights};
use crate::scoring::{ContentScorer, TextCandidate, average_line_len, non_empty_lines};
use crate::utils::{char_len, collapse_whitespace, element_text};

/// Content containers, most specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    ".story-content",
    ".chapter-content",
    ".post-content",
    ".entry-content",
    ".story-text",
    ".chapter-text",
    "#story",
    "#chapter",
    "#content",
    ".content",
    "main",
    "[role='main']",
];

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("valid selector"));

static BLOCK_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, section, article, main").expect("valid selector"));

static LEADING_CHROME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:home|back to top|menu|skip to content|share|like|tweet)\s*[:|»>\-]+\s*)+",
    )
    .expect("valid regex")
});

static CHROME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:home|back to top|menu|skip to content|share(?: this)?|like|tweet|share on \w+)$",
    )
    .expect("valid regex")
});

static COPYRIGHT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:©|copyright\b|\(c\)\s*\d{4}|all rights reserved)").expect("valid regex")
});

/// Picks the main body text of a page.
///
/// Three stages run in order, each only when the previous one produced less
/// than `sufficient_content_len` characters:
/// 1. scored content-selector matches
/// 2. the best group of consecutive sibling paragraphs
/// 3. the largest non-boilerplate block container
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    selectors: Vec<(String, Selector)>,
    filter: BoilerplateFilter,
    scorer: ContentScorer,
    thresholds: ExtractionThresholds,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default(), ScoringWeights::default())
    }
}

impl ContentExtractor {
    pub fn new(thresholds: ExtractionThresholds, weights: ScoringWeights) -> Self {
        let selectors = CONTENT_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
            .collect();

        Self {
            selectors,
            filter: BoilerplateFilter::new(),
            scorer: ContentScorer::new(weights),
            thresholds,
        }
    }

    pub fn scorer(&self) -> &ContentScorer {
        &self.scorer
    }

    /// Normalized body text; empty when the page has nothing usable.
    pub fn extract(&self, document: &Html) -> String {
        self.extract_candidate(document)
            .map(|candidate| candidate.text)
            .unwrap_or_default()
    }

    pub fn extract_candidate(&self, document: &Html) -> Option<TextCandidate> {
        let filtered = self.filter.filtered(document);
        let sufficient = self.thresholds.sufficient_content_len;

        let mut best = self.from_selectors(&filtered);

        if candidate_len(&best) < sufficient {
            if let Some(group) = self.from_paragraph_groups(&filtered) {
                if char_len(&group.text) > candidate_len(&best) {
                    best = Some(group);
                }
            }
        }

        if candidate_len(&best) < sufficient {
            if let Some(block) = self.from_largest_block(&filtered) {
                if char_len(&block.text) > candidate_len(&best) {
                    best = Some(block);
                }
            }
        }

        // A lone paragraph must never outscore the chosen text.
        if let Some(paragraph) = self.best_single_paragraph(&filtered) {
            let chosen = best
                .as_ref()
                .map(|c| self.scorer.score_text(&c.text))
                .unwrap_or(i64::MIN);
            if paragraph.score > chosen {
                best = Some(paragraph);
            }
        }

        if let Some(candidate) = &best {
            log::debug!(
                "Content picked from {} ({} chars, score {})",
                candidate.source,
                char_len(&candidate.text),
                candidate.score
            );
        }
        best.filter(|c| !c.text.is_empty())
    }

    fn from_selectors(&self, document: &Html) -> Option<TextCandidate> {
        let root = document.root_element();
        let mut best: Option<TextCandidate> = None;

        for (source, selector) in &self.selectors {
            for element in root.select(selector) {
                let text = normalize_content(&element_text(element));
                if char_len(&text) <= self.thresholds.candidate_min_len {
                    continue;
                }

                let class = element.value().attr("class").unwrap_or_default();
                let paragraphs = element.select(&PARAGRAPH).count();
                let score = self.scorer.score(&text, class, paragraphs);

                if best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(TextCandidate {
                        text,
                        source: source.clone(),
                        score,
                    });
                }
            }
        }
        best
    }

    fn from_paragraph_groups(&self, document: &Html) -> Option<TextCandidate> {
        let root = document.root_element();
        let mut best: Option<(i64, Vec<String>)> = None;

        for parent in root.select(&ANY_ELEMENT) {
            for group in self.paragraph_runs(parent) {
                let total: usize = group.iter().map(|p| char_len(p)).sum();
                let score = self.scorer.score_group(total, group.len());
                if best.as_ref().is_none_or(|(s, _)| score > *s) {
                    best = Some((score, group));
                }
            }
        }

        best.map(|(score, group)| TextCandidate {
            text: normalize_content(&group.join("\n\n")),
            source: "p-group".to_string(),
            score,
        })
    }

    /// Runs of consecutive `<p>` children. Noise paragraphs and any other
    /// element end the current run.
    fn paragraph_runs(&self, parent: ElementRef) -> Vec<Vec<String>> {
        let mut runs = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for child in parent.child_elements() {
            if child.value().name() == "p" {
                let text = collapse_whitespace(&element_text(child));
                if char_len(&text) >= self.thresholds.paragraph_noise_len {
                    current.push(text);
                    continue;
                }
            }
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    fn from_largest_block(&self, document: &Html) -> Option<TextCandidate> {
        let root = document.root_element();
        let mut best: Option<TextCandidate> = None;

        for element in root.select(&BLOCK_CONTAINER) {
            if self.looks_like_boilerplate(element) {
                continue;
            }
            let text = normalize_content(&element_text(element));
            let len = char_len(&text);
            if len == 0 || best.as_ref().is_some_and(|b| len <= char_len(&b.text)) {
                continue;
            }

            let score = self.scorer.score_text(&text);
            best = Some(TextCandidate {
                text,
                source: format!("largest-{}", element.value().name()),
                score,
            });
        }
        best
    }

    fn looks_like_boilerplate(&self, element: ElementRef) -> bool {
        if self.filter.has_noise_attr(element) {
            return true;
        }
        let raw = element_text(element);
        average_line_len(&raw) < self.thresholds.boilerplate_line_len as f64
            && non_empty_lines(&raw) > self.thresholds.boilerplate_max_lines
    }

    fn best_single_paragraph(&self, document: &Html) -> Option<TextCandidate> {
        document
            .root_element()
            .select(&PARAGRAPH)
            .map(|p| normalize_content(&element_text(p)))
            .filter(|text| !text.is_empty())
            .map(|text| TextCandidate {
                score: self.scorer.score_text(&text),
                text,
                source: "p".to_string(),
            })
            .fold(None, |best: Option<TextCandidate>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }
}

fn candidate_len(candidate: &Option<TextCandidate>) -> usize {
    candidate.as_ref().map_or(0, |c| char_len(&c.text))
}

/// Collapse whitespace inside each paragraph, separate paragraphs with a blank
/// line, and trim chrome phrases and copyright lines from both ends.
pub fn normalize_content(raw: &str) -> String {
    let mut paragraphs: Vec<String> = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect();

    let edge_noise = |line: &String| CHROME_LINE.is_match(line) || COPYRIGHT_LINE.is_match(line);
    let leading = paragraphs.iter().take_while(|line| edge_noise(*line)).count();
    paragraphs.drain(..leading);
    while paragraphs.last().is_some_and(edge_noise) {
        paragraphs.pop();
    }

    if let Some(first) = paragraphs.first_mut() {
        *first = LEADING_CHROME.replace(first, "").trim().to_string();
        if first.is_empty() {
            paragraphs.remove(0);
        }
    }

    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(seed: &str, len: usize) -> String {
        let mut text = String::new();
        while text.len() < len {
            text.push_str(seed);
            text.push(' ');
        }
        text.truncate(len);
        text.trim_end().to_string()
    }

    #[test]
    fn test_article_beats_navigation_blocks() {
        let paragraph = sentence("The river ran quiet under a pale moon.", 200);
        let html = format!(
            r#"<html><body>
                <div class="nav">Home link</div>
                <div class="nav">About us!</div>
                <div class="nav">Contact m</div>
                <article>
                    <p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p>
                </article>
            </body></html>"#
        );

        let candidate = ContentExtractor::default()
            .extract_candidate(&Html::parse_document(&html))
            .unwrap();

        assert_eq!(candidate.source, "article");
        assert_eq!(candidate.text.matches("The river ran quiet").count(), 4 * 5);
        assert!(!candidate.text.contains("Home link"));
        assert!(!candidate.text.contains("About us"));
    }

    #[test]
    fn test_paragraph_group_fallback() {
        let long = sentence("She opened the door and stepped into the rain.", 120);
        let html = format!(
            r#"<html><body>
                <div class="wrapper">
                    <p>{long}</p>
                    <p>tiny</p>
                    <p>{long}</p>
                    <p>{long}</p>
                </div>
            </body></html>"#
        );

        let candidate = ContentExtractor::default()
            .extract_candidate(&Html::parse_document(&html))
            .unwrap();

        assert_eq!(candidate.source, "p-group");
        assert_eq!(candidate.text, format!("{long}\n\n{long}"));
    }

    #[test]
    fn test_largest_block_fallback() {
        let text = sentence("Lines of text without any paragraph tags at all here.", 260);
        let html = format!(
            r#"<html><body>
                <div class="wrapper"><span>{text}</span></div>
                <div class="links">a<br>b<br>c<br>d<br>e<br>f<br>g</div>
            </body></html>"#
        );

        let candidate = ContentExtractor::default()
            .extract_candidate(&Html::parse_document(&html))
            .unwrap();

        assert_eq!(candidate.source, "largest-div");
        assert!(candidate.text.starts_with("Lines of text"));
    }

    #[test]
    fn test_never_worse_than_single_paragraph() {
        let main = sentence("The main element holds a modest amount of text.", 250);
        let long = sentence("A single long paragraph outside every container.", 400);
        let html = format!(
            r#"<html><body>
                <main><p>{main}</p></main>
                <section><b>x</b><p>{long}</p><i>y</i></section>
            </body></html>"#
        );

        let extractor = ContentExtractor::default();
        let document = Html::parse_document(&html);
        let text = extractor.extract(&document);

        let scorer = extractor.scorer();
        assert!(scorer.score_text(&text) >= scorer.score_text(&long));
        assert_eq!(text, long);
    }

    #[test]
    fn test_empty_page_yields_empty_content() {
        let document = Html::parse_document("<html><body><nav>Home</nav></body></html>");
        assert_eq!(ContentExtractor::default().extract(&document), "");
    }

    #[test]
    fn test_normalize_content_strips_chrome() {
        let raw = "\n  Home  \n Back to top » The   night was   long.\n\n  It ended at dawn. \nShare\n© 2024 Stories Inc.";
        assert_eq!(
            normalize_content(raw),
            "The night was long.\n\nIt ended at dawn."
        );
    }

    #[test]
    fn test_normalize_content_keeps_chrome_words_mid_story() {
        let raw = "She whispered one word.\nHome\nCopyright meant nothing to a thief.\nThe end.";
        assert_eq!(
            normalize_content(raw),
            "She whispered one word.\n\nHome\n\nCopyright meant nothing to a thief.\n\nThe end."
        );
    }

    #[test]
    fn test_story_container_with_read_mode_class_survives() {
        let first = sentence("The lantern swung as the ferry left the dock.", 180);
        let second = sentence("Nobody aboard noticed the stranger in grey.", 180);
        let html = format!(
            r#"<html><body>
                <div class="chapter-content read-mode"><p>{first}</p><p>{second}</p></div>
            </body></html>"#
        );

        let candidate = ContentExtractor::default()
            .extract_candidate(&Html::parse_document(&html))
            .unwrap();

        assert_eq!(candidate.source, ".chapter-content");
        assert!(candidate.text.contains("lantern"));
        assert!(candidate.text.contains("stranger in grey"));
    }

    #[test]
    fn test_selector_scores_use_collapsed_text() {
        let body = sentence("Rain fell on the old stone bridge all night.", 150);
        let padded = format!(
            "<article>\n{}\n<p>{body}</p>\n{}\n</article>",
            " ".repeat(400),
            "\t".repeat(200)
        );
        let document = Html::parse_document(&format!("<html><body>{padded}</body></html>"));

        let extractor = ContentExtractor::default();
        let candidate = extractor.extract_candidate(&document).unwrap();

        assert_eq!(candidate.text, body);
        assert_eq!(candidate.score, extractor.scorer().score(&body, "", 1));
    }
}
