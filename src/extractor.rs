use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::author::AuthorExtractor;
use crate::config::{ExtractionThresholds, ScoringWeights};
use crate::content::ContentExtractor;
use crate::title::TitleExtractor;
use crate::utils::{count_words, domain_of_str};

/// Structured record extracted from one story page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub domain: String,
    pub word_count: usize,
    /// Set when no stage found usable body text and `content` is empty.
    #[serde(default)]
    pub degenerate: bool,
}

impl ExtractionResult {
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Runs title, content and author extraction over a rendered page.
#[derive(Debug, Clone)]
pub struct StoryExtractor {
    title: TitleExtractor,
    content: ContentExtractor,
    author: AuthorExtractor,
}

impl Default for StoryExtractor {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default(), ScoringWeights::default())
    }
}

impl StoryExtractor {
    pub fn new(thresholds: ExtractionThresholds, weights: ScoringWeights) -> Self {
        Self {
            title: TitleExtractor::new(&thresholds),
            author: AuthorExtractor::new(&thresholds),
            content: ContentExtractor::new(thresholds, weights),
        }
    }

    pub fn extract(&self, html: &str, url: &str) -> ExtractionResult {
        let document = Html::parse_document(html);
        self.extract_document(&document, url)
    }

    pub fn extract_document(&self, document: &Html, url: &str) -> ExtractionResult {
        let title = self.title.extract(document);
        let author = self.author.extract(document);
        let content = self.content.extract(document);

        ExtractionResult {
            url: url.to_string(),
            word_count: count_words(&content),
            degenerate: content.is_empty(),
            domain: domain_of_str(url),
            title,
            content,
            author,
        }
    }
}
