use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::config::ExtractionThresholds;
use crate::utils::{char_len, collapse_whitespace};

pub const UNTITLED: &str = "Untitled";

/// Structural title selectors, most specific first.
pub const TITLE_SELECTORS: &[&str] = &[
    ".story-title",
    ".chapter-title",
    ".post-title",
    ".entry-title",
    ".content-title",
    "h1.title",
    "h1",
    "h2",
    "h3",
    "title",
];

static SITE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s+|\s*[|–—]\s*").expect("valid regex"));

static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:story|chapter|part)\s*:\s*").expect("valid regex"));

static TRAILING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s,:;\-]*\b(?:read\s+online|free)\s*$").expect("valid regex")
});

static TRAILING_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid regex"));

/// First structural title that survives cleaning within the length bounds.
#[derive(Debug, Clone)]
pub struct TitleExtractor {
    selectors: Vec<Selector>,
    min_len: usize,
    max_len: usize,
}

impl Default for TitleExtractor {
    fn default() -> Self {
        Self::new(&ExtractionThresholds::default())
    }
}

impl TitleExtractor {
    pub fn new(thresholds: &ExtractionThresholds) -> Self {
        let selectors = TITLE_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();

        Self {
            selectors,
            min_len: thresholds.title_min_len,
            max_len: thresholds.title_max_len,
        }
    }

    /// Never empty: falls back to [`UNTITLED`].
    pub fn extract(&self, document: &Html) -> String {
        self.find(document).unwrap_or_else(|| UNTITLED.to_string())
    }

    pub fn find(&self, document: &Html) -> Option<String> {
        let root = document.root_element();

        for selector in &self.selectors {
            for element in root.select(selector) {
                let raw: String = element.text().collect();
                let cleaned = clean_title(&raw);
                let len = char_len(&cleaned);
                if len > self.min_len && len < self.max_len {
                    return Some(cleaned);
                }
            }
        }
        None
    }
}

/// Strip site suffixes, role markers, reading qualifiers and trailing
/// parentheticals. Applied until nothing changes, so cleaning twice equals
/// cleaning once.
pub fn clean_title(raw: &str) -> String {
    let mut current = collapse_whitespace(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(title: &str) -> String {
    let head = SITE_SEPARATOR
        .split(title)
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();

    let head = LEADING_MARKER.replace(head, "");
    let head = TRAILING_QUALIFIER.replace(&head, "");
    let head = TRAILING_PARENTHETICAL.replace(&head, "");

    collapse_whitespace(&head)
}
