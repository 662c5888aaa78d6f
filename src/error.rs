/// Errors raised by the crawler library.
///
/// Degenerate extractions and skipped links are not errors; they surface as
/// sentinel values on `ExtractionResult` and as `CrawlOutcome::Skipped`.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// An href that could not be resolved to an absolute http(s) URL.
    #[error("malformed link: {0}")]
    MalformedLink(String),

    /// Network or render failure while loading a page.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// A filter configuration value that cannot be applied.
    #[error("unsupported filter pattern '{pattern}': {reason}")]
    UnsupportedFilterPattern { pattern: String, reason: String },

    /// A required request field was absent or empty.
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CrawlError {
    pub fn fetch(url: &str, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// True for errors that must abort a run before any link is fetched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFilterPattern { .. }
                | Self::MissingInput(_)
                | Self::InvalidUrl(_)
                | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
