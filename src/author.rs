use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::config::ExtractionThresholds;
use crate::utils::{char_len, collapse_whitespace};

/// Author selectors, most specific first.
pub const AUTHOR_SELECTORS: &[&str] = &[
    ".story-author",
    ".post-author",
    ".author-name",
    ".byline",
    "[rel='author']",
    "[itemprop='author']",
    ".author",
];

static AUTHOR_META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name='author']").expect("valid selector"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

static LEADING_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:written|story|posted)\s+by\b|by\b|author\s*:)\s*:?\s*")
        .expect("valid regex")
});

static TRAILING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+\b(?:writes|wrote|says|said|posted|published|updated|reports)\b.*$")
        .expect("valid regex")
});

static FREE_TEXT_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:written\s+by|by|author:)\s+([a-z][a-z ]{1,49})").expect("valid regex")
});

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s.,\-/]+$").expect("valid regex"));

const GENERIC_IDENTITIES: &[&str] = &[
    "admin",
    "administrator",
    "user",
    "guest",
    "anonymous",
    "unknown",
    "n/a",
    "n-a",
    "na",
    "none",
];

/// Finds a byline via selectors, then `<meta name="author">`, then free text.
#[derive(Debug, Clone)]
pub struct AuthorExtractor {
    selectors: Vec<Selector>,
    min_len: usize,
    max_len: usize,
}

impl Default for AuthorExtractor {
    fn default() -> Self {
        Self::new(&ExtractionThresholds::default())
    }
}

impl AuthorExtractor {
    pub fn new(thresholds: &ExtractionThresholds) -> Self {
        let selectors = AUTHOR_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();

        Self {
            selectors,
            min_len: thresholds.author_min_len,
            max_len: thresholds.author_max_len,
        }
    }

    pub fn extract(&self, document: &Html) -> Option<String> {
        let candidate = self
            .from_selectors(document)
            .or_else(|| from_meta(document))
            .or_else(|| from_free_text(document))?;

        clean_author(&candidate)
    }

    fn from_selectors(&self, document: &Html) -> Option<String> {
        let root = document.root_element();

        for selector in &self.selectors {
            for element in root.select(selector) {
                let text = collapse_whitespace(&element.text().collect::<String>());
                let len = char_len(&text);
                if len > self.min_len && len < self.max_len {
                    return Some(text);
                }
            }
        }
        None
    }
}

fn from_meta(document: &Html) -> Option<String> {
    document
        .root_element()
        .select(&AUTHOR_META)
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

fn from_free_text(document: &Html) -> Option<String> {
    let body = document.root_element().select(&BODY).next()?;
    let text = collapse_whitespace(&body.text().collect::<Vec<_>>().join(" "));

    FREE_TEXT_AUTHOR
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Strip role prefixes and trailing verb phrases, then reject generic or
/// implausible names.
pub fn clean_author(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    let text = LEADING_ROLE.replace(&text, "");
    let text = TRAILING_VERB.replace(&text, "");
    let name = collapse_whitespace(&text);

    if name.is_empty() {
        return None;
    }

    let lower = name.to_lowercase();
    if GENERIC_IDENTITIES.contains(&lower.as_str()) {
        return None;
    }
    if NUMERIC.is_match(&name) {
        return None;
    }
    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    if letters <= 2 {
        return None;
    }

    Some(name)
}
