use actix_web::{HttpResponse, Result, web};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{AppConfig, LinkFilterConfig};
use crate::error::CrawlError;
use crate::extractor::{ExtractionResult, StoryExtractor};
use crate::links::{LinkDiscovery, LinkDiscoveryEngine};
use crate::pipeline::{CrawlContext, CrawlPipeline, CrawlReport};
use crate::renderer::{HttpRenderer, Renderer};
use crate::scheduler::TokioScheduler;
use crate::store::{MemoryStoryStore, SqliteStoryStore, StoryStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn extractor(&self) -> StoryExtractor {
        StoryExtractor::new(self.config.thresholds.clone(), self.config.scoring.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> HttpResponse {
        HttpResponse::Ok().json(ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

fn error_response(err: &CrawlError) -> HttpResponse {
    let body = ApiResponse::<()> {
        success: false,
        message: err.to_string(),
        data: None,
    };

    if err.is_configuration() {
        HttpResponse::BadRequest().json(body)
    } else if matches!(err, CrawlError::Fetch { .. }) {
        HttpResponse::BadGateway().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    #[serde(alias = "pageUrl")]
    pub page_url: String,
    /// Falls back to the server's configured link filter.
    #[serde(default)]
    pub filter: Option<LinkFilterConfig>,
    /// Use a throwaway in-memory store instead of the database.
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    #[serde(alias = "pageUrl")]
    pub page_url: String,
    #[serde(default)]
    pub filter: Option<LinkFilterConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "story-crawler"
    })))
}

pub async fn discover_handler(
    state: web::Data<AppState>,
    req: web::Json<DiscoverRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let filter = req.filter.unwrap_or_else(|| state.config.links.clone());

    match discover(&state.config, &req.page_url, filter).await {
        Ok(discovery) => Ok(ApiResponse::ok(
            format!(
                "Found {} candidate links out of {}",
                discovery.links.len(),
                discovery.total_links_found
            ),
            discovery,
        )),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn discover(
    config: &AppConfig,
    page_url: &str,
    filter: LinkFilterConfig,
) -> Result<LinkDiscovery, CrawlError> {
    if page_url.trim().is_empty() {
        return Err(CrawlError::MissingInput("page_url"));
    }
    let engine = LinkDiscoveryEngine::new(filter)?;
    let renderer = HttpRenderer::new(&config.crawl)?;
    let page = renderer.render(page_url.trim()).await?;
    engine.discover_html(&page.html, &page.url)
}

pub async fn extract_handler(
    state: web::Data<AppState>,
    req: web::Json<ExtractRequest>,
) -> Result<HttpResponse> {
    log::info!("Received extract request for: {}", req.url);

    match extract(&state, &req.url).await {
        Ok(result) => Ok(ApiResponse::ok(
            format!("Extracted {} words", result.word_count),
            result,
        )),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn extract(state: &AppState, url: &str) -> Result<ExtractionResult, CrawlError> {
    if url.trim().is_empty() {
        return Err(CrawlError::MissingInput("url"));
    }
    let renderer = HttpRenderer::new(&state.config.crawl)?;
    let page = renderer.render(url.trim()).await?;
    Ok(state.extractor().extract(&page.html, &page.url))
}

pub async fn crawl_handler(
    state: web::Data<AppState>,
    req: web::Json<CrawlRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    log::info!("Received crawl request for: {}", req.page_url);

    let filter = req.filter.unwrap_or_else(|| state.config.links.clone());
    let outcome = if req.dry_run {
        crawl(&state, MemoryStoryStore::new(), &req.page_url, filter).await
    } else {
        match SqliteStoryStore::open(&state.config.database_path) {
            Ok(store) => crawl(&state, store, &req.page_url, filter).await,
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok(report) => Ok(ApiResponse::ok(
            format!(
                "Processed {} links: {} successful, {} skipped, {} failed",
                report.links_processed,
                report.summary.successful,
                report.summary.skipped,
                report.summary.failed
            ),
            report,
        )),
        Err(e) => {
            log::error!("Crawl failed: {}", e);
            Ok(error_response(&e))
        }
    }
}

async fn crawl<S: StoryStore>(
    state: &AppState,
    store: S,
    page_url: &str,
    filter: LinkFilterConfig,
) -> Result<CrawlReport, CrawlError> {
    let renderer = HttpRenderer::new(&state.config.crawl)?;
    let pipeline = CrawlPipeline::new(state.extractor(), state.config.crawl.clone());
    let mut ctx = CrawlContext::new(renderer, store, TokioScheduler);
    pipeline.crawl_page(&mut ctx, page_url, filter).await
}
