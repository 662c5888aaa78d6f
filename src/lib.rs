// Story Crawler Library
//
// Finds candidate story links on a page, then fetches each one in turn and
// extracts its title, author and body text with layered heuristics.

pub mod api;
pub mod author;
pub mod boilerplate;
pub mod config;
pub mod content;
pub mod error;
pub mod extractor;
pub mod links;
pub mod pipeline;
pub mod renderer;
pub mod scheduler;
pub mod scoring;
pub mod store;
pub mod title;
pub mod utils;

// Re-export main types for convenience
pub use author::{AuthorExtractor, clean_author};
pub use boilerplate::BoilerplateFilter;
pub use config::{
    AppConfig, CrawlConfig, ExtractionThresholds, LinkFilterConfig, LinkThresholds, ScoringWeights,
    ServerConfig,
};
pub use content::{ContentExtractor, normalize_content};
pub use error::{CrawlError, Result};
pub use extractor::{ExtractionResult, StoryExtractor};
pub use links::{CandidateLink, LinkDiscovery, LinkDiscoveryEngine};
pub use pipeline::{
    CancelHandle, CrawlContext, CrawlOutcome, CrawlPipeline, CrawlReport, CrawlSummary,
    LinkOutcome, SkipReason,
};
pub use renderer::{HttpRenderer, RenderedPage, Renderer};
pub use scheduler::{Scheduler, TokioScheduler};
pub use scoring::{ContentScorer, TextCandidate};
pub use store::{MemoryStoryStore, SqliteStoryStore, StoredStory, StoryStore};
pub use title::{TitleExtractor, UNTITLED, clean_title};
pub use utils::{USER_AGENTS, get_random_user_agent};
