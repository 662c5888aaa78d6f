use std::future::Future;
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::utils::get_random_user_agent;

/// A fully loaded page and the URL it was finally served from
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Loads a page and hands back its rendered HTML.
///
/// This is the only network-bound call the pipeline makes for page content.
pub trait Renderer {
    fn render(&self, url: &str) -> impl Future<Output = Result<RenderedPage>>;
}

/// Plain HTTP renderer: no script execution, rotated desktop user agents.
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let user_agent = get_random_user_agent();

        let response = self
            .client
            .get(url)
            .header("User-Agent", user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| CrawlError::fetch(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(CrawlError::fetch(url, format!("HTTP error: {}", response.status())));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| CrawlError::fetch(url, format!("failed to read response body: {e}")))?;

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }
}
