use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CrawlError;

/// Top-level configuration, loaded from an optional TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_path: String,
    pub crawl: CrawlConfig,
    pub links: LinkFilterConfig,
    pub thresholds: ExtractionThresholds,
    pub scoring: ScoringWeights,
}

impl AppConfig {
    /// Load from `path` when given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<AppConfig>(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => AppConfig::default(),
        };

        if config.database_path.is_empty() {
            config.database_path = default_database_path();
        }
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse::<u16>()
                .context("PORT must be a valid number")?;
        }
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database_path = path;
        }
        Ok(())
    }
}

fn default_database_path() -> String {
    "stories.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Pipeline scheduling and persistence policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Politeness pause after every fetched link that succeeded or failed.
    pub inter_request_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Write the record before the length check and delete it again when too short.
    pub persist_before_length_check: bool,
}

impl CrawlConfig {
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            inter_request_delay_ms: 3000,
            request_timeout_secs: 30,
            persist_before_length_check: false,
        }
    }
}

/// Link discovery options. Every field is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkFilterConfig {
    #[serde(alias = "linkSelector")]
    pub link_selector: String,
    /// OR-matched inclusion; when non-empty it replaces the keyword heuristics.
    #[serde(alias = "filterPatterns")]
    pub filter_patterns: Vec<String>,
    /// Case-insensitive substrings that exclude a URL.
    #[serde(alias = "excludePatterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(alias = "sameDomainOnly")]
    pub same_domain_only: bool,
    #[serde(alias = "maxLinks")]
    pub max_links: usize,
    #[serde(alias = "minContentLength")]
    pub min_content_length: usize,
    #[serde(alias = "storyKeywords")]
    pub story_keywords: Vec<String>,
    pub thresholds: LinkThresholds,
}

impl Default for LinkFilterConfig {
    fn default() -> Self {
        Self {
            link_selector: "a[href]".to_string(),
            filter_patterns: Vec::new(),
            exclude_patterns: [
                "mailto:",
                "javascript:",
                ".jpg",
                ".jpeg",
                ".png",
                ".gif",
                ".pdf",
                "/login",
                "/register",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            same_domain_only: true,
            max_links: 50,
            min_content_length: 500,
            story_keywords: ["story", "chapter", "part", "episode", "tale", "fiction"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thresholds: LinkThresholds::default(),
        }
    }
}

impl LinkFilterConfig {
    /// Reject configuration that cannot be applied, before any fetching starts.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.link_selector.trim().is_empty() {
            return Err(CrawlError::UnsupportedFilterPattern {
                pattern: self.link_selector.clone(),
                reason: "link selector is empty".to_string(),
            });
        }
        if let Err(e) = Selector::parse(&self.link_selector) {
            return Err(CrawlError::UnsupportedFilterPattern {
                pattern: self.link_selector.clone(),
                reason: format!("not a valid CSS selector: {e}"),
            });
        }

        let patterns = self
            .filter_patterns
            .iter()
            .chain(&self.exclude_patterns)
            .chain(&self.story_keywords);
        for pattern in patterns {
            if pattern.trim().is_empty() {
                return Err(CrawlError::UnsupportedFilterPattern {
                    pattern: pattern.clone(),
                    reason: "blank patterns match every link".to_string(),
                });
            }
        }

        if self.max_links == 0 {
            return Err(CrawlError::Config("max_links must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Length cutoffs used by the link heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkThresholds {
    pub min_text_len: usize,
    /// Exclusive bounds for link text that looks like a title.
    pub title_text_min: usize,
    pub title_text_max: usize,
    /// Navigation words only reject links whose combined text is shorter than this.
    pub nav_combined_max: usize,
    pub parent_text_max: usize,
}

impl Default for LinkThresholds {
    fn default() -> Self {
        Self {
            min_text_len: 3,
            title_text_min: 10,
            title_text_max: 200,
            nav_combined_max: 50,
            parent_text_max: 300,
        }
    }
}

/// Length cutoffs used by the title, author and content extractors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionThresholds {
    /// Exclusive bounds on accepted title length.
    pub title_min_len: usize,
    pub title_max_len: usize,
    /// Exclusive bounds on accepted selector-based author text.
    pub author_min_len: usize,
    pub author_max_len: usize,
    /// Selector candidates must exceed this many characters.
    pub candidate_min_len: usize,
    /// A stage result shorter than this lets the next stage run.
    pub sufficient_content_len: usize,
    /// Paragraphs shorter than this are noise and break a paragraph group.
    pub paragraph_noise_len: usize,
    pub boilerplate_line_len: usize,
    pub boilerplate_max_lines: usize,
}

impl Default for ExtractionThresholds {
    fn default() -> Self {
        Self {
            title_min_len: 3,
            title_max_len: 200,
            author_min_len: 1,
            author_max_len: 100,
            candidate_min_len: 100,
            sufficient_content_len: 200,
            paragraph_noise_len: 20,
            boilerplate_line_len: 20,
            boilerplate_max_lines: 5,
        }
    }
}

/// Weights for content scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub paragraph_bonus: i64,
    pub story_class_bonus: i64,
    pub nav_class_penalty: i64,
    pub short_line_penalty: i64,
    pub short_line_len: usize,
    pub group_paragraph_bonus: i64,
    pub story_class_keywords: Vec<String>,
    pub nav_class_keywords: Vec<String>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            paragraph_bonus: 50,
            story_class_bonus: 100,
            nav_class_penalty: 200,
            short_line_penalty: 100,
            short_line_len: 30,
            group_paragraph_bonus: 20,
            story_class_keywords: ["story", "chapter", "content", "text", "body", "post"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            nav_class_keywords: ["nav", "menu", "sidebar", "footer", "header"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
