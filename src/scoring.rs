use crate::config::ScoringWeights;
use crate::utils::char_len;

/// A provisional body of text awaiting selection
#[derive(Debug, Clone, PartialEq)]
pub struct TextCandidate {
    pub text: String,
    /// Selector or origin tag that produced the text.
    pub source: String,
    pub score: i64,
}

/// Additive quality score for a block of text.
///
/// Length and paragraph count push the score up, story-like class names add a
/// bonus, navigation-like class names subtract a penalty, and text made of short
/// lines (link lists, menus) is penalised once.
#[derive(Debug, Clone, Default)]
pub struct ContentScorer {
    weights: ScoringWeights,
}

impl ContentScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, text: &str, class_attr: &str, paragraph_count: usize) -> i64 {
        let w = &self.weights;
        let text_len = char_len(text);
        let class_lower = class_attr.to_lowercase();

        let mut score = text_len as i64 + w.paragraph_bonus * paragraph_count as i64;

        for keyword in &w.story_class_keywords {
            if class_lower.contains(keyword.as_str()) {
                score += w.story_class_bonus;
            }
        }
        for keyword in &w.nav_class_keywords {
            if class_lower.contains(keyword.as_str()) {
                score -= w.nav_class_penalty;
            }
        }

        if average_line_len(text) < w.short_line_len as f64 {
            score -= w.short_line_penalty;
        }

        score
    }

    /// Score of bare text with no element metadata.
    pub fn score_text(&self, text: &str) -> i64 {
        self.score(text, "", 0)
    }

    /// Score of a paragraph group: total length plus a per-paragraph bonus.
    pub fn score_group(&self, total_len: usize, paragraph_count: usize) -> i64 {
        total_len as i64 + self.weights.group_paragraph_bonus * paragraph_count as i64
    }
}

pub fn non_empty_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Characters per non-empty line; empty text averages zero.
pub fn average_line_len(text: &str) -> f64 {
    let lines = non_empty_lines(text);
    if lines == 0 {
        return 0.0;
    }
    char_len(text) as f64 / lines as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prose_scores_its_length() {
        let scorer = ContentScorer::default();
        let text = "a".repeat(120);
        assert_eq!(scorer.score(&text, "", 0), 120);
    }

    #[test]
    fn test_paragraph_and_class_bonuses() {
        let scorer = ContentScorer::default();
        let text = "a".repeat(100);
        // "story" and "content" both match
        assert_eq!(scorer.score(&text, "story-content", 2), 100 + 100 + 200);
    }

    #[test]
    fn test_navigation_class_penalty() {
        let scorer = ContentScorer::default();
        let text = "a".repeat(100);
        assert_eq!(scorer.score(&text, "main-nav", 0), 100 - 200);
        assert_eq!(scorer.score(&text, "sidebar menu", 0), 100 - 400);
    }

    #[test]
    fn test_short_lines_are_penalised() {
        let scorer = ContentScorer::default();
        let text = "Home\nAbout\nContact\nLogin";
        let len = char_len(text) as i64;
        assert_eq!(scorer.score(text, "", 0), len - 100);
    }

    #[test]
    fn test_custom_weights() {
        let scorer = ContentScorer::new(ScoringWeights {
            paragraph_bonus: 1,
            short_line_len: 0,
            ..Default::default()
        });
        assert_eq!(scorer.score("short", "", 3), 5 + 3);
    }

    #[test]
    fn test_group_score() {
        let scorer = ContentScorer::default();
        assert_eq!(scorer.score_group(300, 4), 380);
    }
}
