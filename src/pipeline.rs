use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{CrawlConfig, LinkFilterConfig};
use crate::error::{CrawlError, Result};
use crate::extractor::{ExtractionResult, StoryExtractor};
use crate::links::{CandidateLink, LinkDiscoveryEngine};
use crate::renderer::Renderer;
use crate::scheduler::Scheduler;
use crate::store::StoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DuplicateUrl,
    TooShort,
}

/// Terminal state of one candidate link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrawlOutcome {
    Success { id: String, result: ExtractionResult },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl CrawlOutcome {
    /// Outcomes that went over the network and earn a politeness pause.
    fn fetched(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub url: String,
    #[serde(flatten)]
    pub outcome: CrawlOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CrawlSummary {
    fn record(&mut self, outcome: &CrawlOutcome) {
        match outcome {
            CrawlOutcome::Success { .. } => self.successful += 1,
            CrawlOutcome::Skipped { .. } => self.skipped += 1,
            CrawlOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Result of one crawl run, in link processing order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub page_url: String,
    pub total_links_found: usize,
    pub links_processed: usize,
    pub results: Vec<LinkOutcome>,
    pub errors: Vec<String>,
    pub summary: CrawlSummary,
    pub cancelled: bool,
}

/// Aborts a run between links. An in-flight fetch always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Collaborators shared by every link of a run.
///
/// One renderer and one store handle per run, both dropped with the context.
pub struct CrawlContext<R, S, C> {
    pub renderer: R,
    pub store: S,
    pub scheduler: C,
}

impl<R, S, C> CrawlContext<R, S, C> {
    pub fn new(renderer: R, store: S, scheduler: C) -> Self {
        Self {
            renderer,
            store,
            scheduler,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Sequential fetch-extract-persist loop over candidate links.
pub struct CrawlPipeline {
    extractor: StoryExtractor,
    config: CrawlConfig,
    cancel: CancelHandle,
}

impl CrawlPipeline {
    pub fn new(extractor: StoryExtractor, config: CrawlConfig) -> Self {
        Self {
            extractor,
            config,
            cancel: CancelHandle::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Discover links on `page_url` and crawl them.
    ///
    /// Configuration problems are returned before anything is fetched.
    pub async fn crawl_page<R, S, C>(
        &self,
        ctx: &mut CrawlContext<R, S, C>,
        page_url: &str,
        filter: LinkFilterConfig,
    ) -> Result<CrawlReport>
    where
        R: Renderer,
        S: StoryStore,
        C: Scheduler,
    {
        let page_url = page_url.trim();
        if page_url.is_empty() {
            return Err(CrawlError::MissingInput("page_url"));
        }
        url::Url::parse(page_url)?;

        let min_content_length = filter.min_content_length;
        let engine = LinkDiscoveryEngine::new(filter)?;

        log::info!("🔍 Scanning {} for story links", page_url);
        let page = ctx.renderer.render(page_url).await?;
        let discovery = engine.discover_html(&page.html, &page.url)?;

        let mut report = self
            .process_links(ctx, page_url, &discovery.links, min_content_length)
            .await;
        report.total_links_found = discovery.total_links_found;
        Ok(report)
    }

    /// Process `links` strictly in order, one at a time.
    pub async fn process_links<R, S, C>(
        &self,
        ctx: &mut CrawlContext<R, S, C>,
        page_url: &str,
        links: &[CandidateLink],
        min_content_length: usize,
    ) -> CrawlReport
    where
        R: Renderer,
        S: StoryStore,
        C: Scheduler,
    {
        let mut results = Vec::with_capacity(links.len());
        let mut errors = Vec::new();
        let mut summary = CrawlSummary::default();
        let mut cancelled = false;
        let delay = self.config.inter_request_delay();

        for (index, link) in links.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::warn!("Crawl cancelled after {} of {} links", index, links.len());
                cancelled = true;
                break;
            }

            let outcome = self.process_link(ctx, link, min_content_length).await;
            match &outcome {
                CrawlOutcome::Success { result, .. } => {
                    log::info!("✅ {} ({} words): {}", result.title, result.word_count, link.url)
                }
                CrawlOutcome::Skipped { reason } => {
                    log::info!("⏭️  Skipped {:?}: {}", reason, link.url)
                }
                CrawlOutcome::Failed { error } => {
                    log::error!("❌ Failed {}: {}", link.url, error);
                    errors.push(format!("{}: {}", link.url, error));
                }
            }
            summary.record(&outcome);

            let pause = outcome.fetched() && index + 1 < links.len();
            results.push(LinkOutcome {
                url: link.url.clone(),
                outcome,
            });

            if pause {
                ctx.scheduler.pause(delay).await;
            }
        }

        log::info!(
            "Crawl finished: {} successful, {} skipped, {} failed",
            summary.successful,
            summary.skipped,
            summary.failed
        );

        CrawlReport {
            page_url: page_url.to_string(),
            total_links_found: links.len(),
            links_processed: results.len(),
            results,
            errors,
            summary,
            cancelled,
        }
    }

    async fn process_link<R, S, C>(
        &self,
        ctx: &mut CrawlContext<R, S, C>,
        link: &CandidateLink,
        min_content_length: usize,
    ) -> CrawlOutcome
    where
        R: Renderer,
        S: StoryStore,
        C: Scheduler,
    {
        match self.try_process_link(ctx, link, min_content_length).await {
            Ok(outcome) => outcome,
            Err(e) => CrawlOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn try_process_link<R, S, C>(
        &self,
        ctx: &mut CrawlContext<R, S, C>,
        link: &CandidateLink,
        min_content_length: usize,
    ) -> Result<CrawlOutcome>
    where
        R: Renderer,
        S: StoryStore,
        C: Scheduler,
    {
        if ctx.store.contains_url(&link.url)? {
            return Ok(CrawlOutcome::Skipped {
                reason: SkipReason::DuplicateUrl,
            });
        }

        let page = ctx.renderer.render(&link.url).await?;
        let result = self.extractor.extract(&page.html, &link.url);
        let too_short = result.content_len() < min_content_length;

        if self.config.persist_before_length_check {
            let id = ctx.store.insert(&result)?;
            if too_short {
                ctx.store.delete(&id)?;
                return Ok(CrawlOutcome::Skipped {
                    reason: SkipReason::TooShort,
                });
            }
            return Ok(CrawlOutcome::Success { id, result });
        }

        if too_short {
            return Ok(CrawlOutcome::Skipped {
                reason: SkipReason::TooShort,
            });
        }

        let id = ctx.store.insert(&result)?;
        Ok(CrawlOutcome::Success { id, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderedPage;
    use crate::store::MemoryStoryStore;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeRenderer {
        pages: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRenderer {
        fn page(mut self, url: &str, html: String) -> Self {
            self.pages.insert(url.to_string(), html);
            self
        }
    }

    impl Renderer for FakeRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            self.calls.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .map(|html| RenderedPage {
                    url: url.to_string(),
                    html: html.clone(),
                })
                .ok_or_else(|| CrawlError::fetch(url, "HTTP error: 404 Not Found"))
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        pauses: RefCell<Vec<Duration>>,
        cancel_on_pause: Option<CancelHandle>,
    }

    impl Scheduler for RecordingScheduler {
        async fn pause(&self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
            if let Some(handle) = &self.cancel_on_pause {
                handle.cancel();
            }
        }
    }

    fn story_page(chars: usize) -> String {
        let sentence = "The wind carried her name across the frozen lake at night. ";
        let body: String = sentence.chars().cycle().take(chars).collect();
        format!(
            "<html><head><title>A Story</title></head><body><article><p>{body}</p></article></body></html>"
        )
    }

    fn short_page() -> String {
        "<html><body><p>Only fifty characters of story text live here, ok.</p></body></html>".to_string()
    }

    fn link(url: &str) -> CandidateLink {
        CandidateLink {
            url: url.to_string(),
            text: "A story".to_string(),
            parent_text: String::new(),
            domain: "site.com".to_string(),
        }
    }

    fn pipeline(delay_ms: u64) -> CrawlPipeline {
        CrawlPipeline::new(
            StoryExtractor::default(),
            CrawlConfig {
                inter_request_delay_ms: delay_ms,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_duplicate_short_and_success_in_order() {
        let renderer = FakeRenderer::default()
            .page("http://site.com/b", short_page())
            .page("http://site.com/c", story_page(2000));
        let store = MemoryStoryStore::with_urls(["http://site.com/a"]);
        let mut ctx = CrawlContext::new(renderer, store, RecordingScheduler::default());

        let links = [
            link("http://site.com/a"),
            link("http://site.com/b"),
            link("http://site.com/c"),
        ];
        let report = pipeline(5000).process_links(&mut ctx, "http://site.com/", &links, 500).await;

        assert_eq!(
            report.summary,
            CrawlSummary {
                successful: 1,
                skipped: 2,
                failed: 0
            }
        );
        let order: Vec<&str> = report.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(order, vec!["http://site.com/a", "http://site.com/b", "http://site.com/c"]);
        assert_eq!(
            report.results[0].outcome,
            CrawlOutcome::Skipped {
                reason: SkipReason::DuplicateUrl
            }
        );
        assert_eq!(
            report.results[1].outcome,
            CrawlOutcome::Skipped {
                reason: SkipReason::TooShort
            }
        );
        assert!(matches!(report.results[2].outcome, CrawlOutcome::Success { .. }));

        // duplicates are never fetched, the last link has no follower to wait for
        assert_eq!(*ctx.renderer.calls.borrow(), vec!["http://site.com/b", "http://site.com/c"]);
        assert!(ctx.scheduler.pauses.borrow().is_empty());
        assert_eq!(ctx.store.len(), 2);
        assert_eq!(report.links_processed, 3);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_throttled() {
        let renderer = FakeRenderer::default()
            .page("http://site.com/1", story_page(800))
            .page("http://site.com/3", story_page(900));
        let mut ctx =
            CrawlContext::new(renderer, MemoryStoryStore::new(), RecordingScheduler::default());

        let links = [
            link("http://site.com/1"),
            link("http://site.com/2"),
            link("http://site.com/3"),
        ];
        let report = pipeline(3000).process_links(&mut ctx, "http://site.com/", &links, 500).await;

        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("http://site.com/2"));
        assert_eq!(
            *ctx.scheduler.pauses.borrow(),
            vec![Duration::from_millis(3000), Duration::from_millis(3000)]
        );
    }

    #[tokio::test]
    async fn test_skips_do_not_pause() {
        let renderer = FakeRenderer::default().page("http://site.com/2", story_page(800));
        let store = MemoryStoryStore::with_urls(["http://site.com/1"]);
        let mut ctx = CrawlContext::new(renderer, store, RecordingScheduler::default());

        let links = [link("http://site.com/1"), link("http://site.com/2")];
        pipeline(3000).process_links(&mut ctx, "http://site.com/", &links, 500).await;

        assert!(ctx.scheduler.pauses.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_speculative_write_is_rolled_back() {
        let renderer = FakeRenderer::default()
            .page("http://site.com/short", short_page())
            .page("http://site.com/long", story_page(1200));
        let mut ctx =
            CrawlContext::new(renderer, MemoryStoryStore::new(), RecordingScheduler::default());

        let pipeline = CrawlPipeline::new(
            StoryExtractor::default(),
            CrawlConfig {
                persist_before_length_check: true,
                ..Default::default()
            },
        );
        let links = [link("http://site.com/short"), link("http://site.com/long")];
        let report = pipeline.process_links(&mut ctx, "http://site.com/", &links, 500).await;

        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.successful, 1);
        let store = ctx.into_store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.stories()[0].result.url, "http://site.com/long");
    }

    #[tokio::test]
    async fn test_cancel_between_links() {
        let renderer = FakeRenderer::default()
            .page("http://site.com/1", story_page(800))
            .page("http://site.com/2", story_page(800));
        let pipeline = pipeline(10);
        let scheduler = RecordingScheduler {
            cancel_on_pause: Some(pipeline.cancel_handle()),
            ..Default::default()
        };
        let mut ctx = CrawlContext::new(renderer, MemoryStoryStore::new(), scheduler);

        let links = [link("http://site.com/1"), link("http://site.com/2")];
        let report = pipeline.process_links(&mut ctx, "http://site.com/", &links, 500).await;

        assert!(report.cancelled);
        assert_eq!(report.links_processed, 1);
        assert_eq!(*ctx.renderer.calls.borrow(), vec!["http://site.com/1"]);
    }

    #[tokio::test]
    async fn test_crawl_page_discovers_then_processes() {
        let index = r#"<html><body>
            <ul class="stories">
                <li><a href="/story/1">Chapter 1: The Frozen Lake</a></li>
                <li><a href="/story/2">Chapter 2: The Thaw</a></li>
                <li><a href="/contact">Contact</a></li>
            </ul>
        </body></html>"#;
        let renderer = FakeRenderer::default()
            .page("http://site.com/", index.to_string())
            .page("http://site.com/story/1", story_page(900))
            .page("http://site.com/story/2", story_page(1000));
        let mut ctx =
            CrawlContext::new(renderer, MemoryStoryStore::new(), RecordingScheduler::default());

        let report = pipeline(0)
            .crawl_page(&mut ctx, "http://site.com/", LinkFilterConfig::default())
            .await
            .unwrap();

        assert_eq!(report.total_links_found, 3);
        assert_eq!(report.links_processed, 2);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(ctx.store.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["successful"], 2);
        assert_eq!(json["results"][0]["status"], "success");
        assert_eq!(json["page_url"], "http://site.com/");
    }

    #[tokio::test]
    async fn test_configuration_error_before_fetching() {
        let mut ctx = CrawlContext::new(
            FakeRenderer::default(),
            MemoryStoryStore::new(),
            RecordingScheduler::default(),
        );
        let filter = LinkFilterConfig {
            filter_patterns: vec![" ".to_string()],
            ..Default::default()
        };

        let err = pipeline(0)
            .crawl_page(&mut ctx, "http://site.com/", filter)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(ctx.renderer.calls.borrow().is_empty());

        let err = pipeline(0)
            .crawl_page(&mut ctx, "  ", LinkFilterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::MissingInput("page_url")));
    }
}
