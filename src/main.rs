use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use story_crawler::api::{self, AppState};
use story_crawler::{
    AppConfig, CancelHandle, CrawlContext, CrawlPipeline, HttpRenderer, LinkDiscoveryEngine,
    MemoryStoryStore, Renderer, SqliteStoryStore, StoryExtractor, StoryStore, TokioScheduler,
};

#[derive(Parser)]
#[command(
    name = "story-crawler",
    version,
    about = "Crawl story links and extract title, author and text"
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the JSON HTTP API
    Serve,
    /// Discover story links on a page and crawl them
    Crawl {
        page_url: String,
        /// Keep results in memory instead of the database
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        max_links: Option<usize>,
        #[arg(long)]
        min_content_length: Option<usize>,
        /// Only follow links containing this text (repeatable)
        #[arg(long = "filter")]
        filter_patterns: Vec<String>,
        /// Politeness delay between fetched links, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// List the candidate links a crawl would visit
    Discover { page_url: String },
    /// Extract a single page
    Extract { url: String },
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Crawl {
            page_url,
            dry_run,
            max_links,
            min_content_length,
            filter_patterns,
            delay_ms,
        } => {
            if let Some(max) = max_links {
                config.links.max_links = max;
            }
            if let Some(min) = min_content_length {
                config.links.min_content_length = min;
            }
            if !filter_patterns.is_empty() {
                config.links.filter_patterns = filter_patterns;
            }
            if let Some(delay) = delay_ms {
                config.crawl.inter_request_delay_ms = delay;
            }

            if dry_run {
                crawl(&config, MemoryStoryStore::new(), &page_url).await
            } else {
                let store = SqliteStoryStore::open(&config.database_path)
                    .with_context(|| format!("Failed to open database {}", config.database_path))?;
                crawl(&config, store, &page_url).await
            }
        }
        Command::Discover { page_url } => {
            let engine = LinkDiscoveryEngine::new(config.links.clone())?;
            let renderer = HttpRenderer::new(&config.crawl)?;
            let page = renderer.render(&page_url).await?;
            print_json(&engine.discover_html(&page.html, &page.url)?)
        }
        Command::Extract { url } => {
            let renderer = HttpRenderer::new(&config.crawl)?;
            let page = renderer.render(&url).await?;
            let extractor = StoryExtractor::new(config.thresholds.clone(), config.scoring.clone());
            print_json(&extractor.extract(&page.html, &page.url))
        }
    }
}

async fn crawl<S: StoryStore>(config: &AppConfig, store: S, page_url: &str) -> Result<()> {
    let extractor = StoryExtractor::new(config.thresholds.clone(), config.scoring.clone());
    let pipeline = CrawlPipeline::new(extractor, config.crawl.clone());
    cancel_on_ctrl_c(pipeline.cancel_handle());

    let renderer = HttpRenderer::new(&config.crawl)?;
    let mut ctx = CrawlContext::new(renderer, store, TokioScheduler);
    let report = pipeline
        .crawl_page(&mut ctx, page_url, config.links.clone())
        .await
        .with_context(|| format!("Crawl of {} failed", page_url))?;

    print_json(&report)
}

fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current link");
            handle.cancel();
        }
    });
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = web::Data::new(AppState::new(config));

    log::info!("🚀 Starting story crawler");
    log::info!("🌐 Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            .route("/api/health", web::get().to(api::health_check))
            .route("/api/discover", web::post().to(api::discover_handler))
            .route("/api/extract", web::post().to(api::extract_handler))
            .route("/api/crawl", web::post().to(api::crawl_handler))
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .run()
    .await
    .context("HTTP server stopped with an error")
}
