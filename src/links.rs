use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::config::LinkFilterConfig;
use crate::error::{CrawlError, Result};
use crate::utils::{char_len, collapse_whitespace, domain_of, normalize_url, truncate_chars};

const NAVIGATION_WORDS: &[&str] = &[
    "home",
    "about",
    "contact",
    "login",
    "register",
    "search",
    "menu",
    "navigation",
    "footer",
    "header",
    "sidebar",
];

const GENERIC_WORDS: &[&str] = &[
    "more",
    "click",
    "here",
    "link",
    "page",
    "read more",
    "click here",
];

static EPISODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:chapter|part|episode|ch|ep)(?:\.?\s*\d+|\.?\s+[ivxlcdm]+)\b")
        .expect("valid regex")
});

/// A link that may lead to a story page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub url: String,
    pub text: String,
    pub parent_text: String,
    pub domain: String,
}

impl CandidateLink {
    fn combined_text(&self) -> String {
        format!("{} {}", self.text, self.parent_text)
    }
}

/// Filtered links plus the raw count of selector matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkDiscovery {
    pub links: Vec<CandidateLink>,
    pub total_links_found: usize,
}

/// Extracts, filters and deduplicates candidate story links from a page.
#[derive(Debug, Clone)]
pub struct LinkDiscoveryEngine {
    config: LinkFilterConfig,
    selector: Selector,
}

impl LinkDiscoveryEngine {
    /// Fails with `UnsupportedFilterPattern` before any page is touched.
    pub fn new(config: LinkFilterConfig) -> Result<Self> {
        config.validate()?;
        let selector = Selector::parse(&config.link_selector).map_err(|e| {
            CrawlError::UnsupportedFilterPattern {
                pattern: config.link_selector.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &LinkFilterConfig {
        &self.config
    }

    pub fn discover_html(&self, html: &str, page_url: &str) -> Result<LinkDiscovery> {
        let document = Html::parse_document(html);
        self.discover(&document, page_url)
    }

    pub fn discover(&self, document: &Html, page_url: &str) -> Result<LinkDiscovery> {
        let base = Url::parse(page_url)?;
        let page_domain = domain_of(&base);

        let mut total_links_found = 0;
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.root_element().select(&self.selector) {
            total_links_found += 1;

            let link = match self.candidate(element, &base) {
                Ok(link) => link,
                Err(e) => {
                    log::debug!("Dropping link: {}", e);
                    continue;
                }
            };

            if let Some(reason) = self.rejection(&link, &page_domain) {
                log::debug!("Rejected {} ({})", link.url, reason);
                continue;
            }

            if seen.insert(link.url.clone()) {
                links.push(link);
            }
        }

        links.truncate(self.config.max_links);

        log::info!(
            "🔗 Discovered {} candidate links ({} found) on {}",
            links.len(),
            total_links_found,
            page_url
        );

        Ok(LinkDiscovery {
            links,
            total_links_found,
        })
    }

    fn candidate(&self, element: ElementRef, base: &Url) -> Result<CandidateLink> {
        let href = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CrawlError::MalformedLink("missing href".to_string()))?;

        let resolved = base
            .join(href)
            .map_err(|e| CrawlError::MalformedLink(format!("{href}: {e}")))?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return Err(CrawlError::MalformedLink(format!("{href}: unsupported scheme")));
        }

        let text = collapse_whitespace(&element.text().collect::<String>());
        let parent_text = element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| collapse_whitespace(&parent.text().collect::<String>()))
            .map(|t| truncate_chars(&t, self.config.thresholds.parent_text_max))
            .unwrap_or_default();

        Ok(CandidateLink {
            url: normalize_url(&resolved),
            domain: domain_of(&resolved),
            text,
            parent_text,
        })
    }

    /// First filter in the chain that rejects the link, if any.
    fn rejection(&self, link: &CandidateLink, page_domain: &str) -> Option<&'static str> {
        let config = &self.config;
        let limits = &config.thresholds;
        let url_lower = link.url.to_lowercase();
        let text_lower = link.text.to_lowercase();
        let combined = link.combined_text();
        let combined_lower = combined.to_lowercase();

        if config.same_domain_only && link.domain != page_domain {
            return Some("other domain");
        }

        if config
            .exclude_patterns
            .iter()
            .any(|p| url_lower.contains(&p.to_lowercase()))
        {
            return Some("excluded pattern");
        }

        let nav_word = text_lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| NAVIGATION_WORDS.contains(&word));
        if nav_word && char_len(&combined) < limits.nav_combined_max {
            return Some("navigation text");
        }

        let text_len = char_len(&link.text);
        if text_len < limits.min_text_len || GENERIC_WORDS.contains(&text_lower.as_str()) {
            return Some("generic text");
        }

        if !config.filter_patterns.is_empty() {
            let matched = config.filter_patterns.iter().any(|p| {
                let p = p.to_lowercase();
                url_lower.contains(&p) || combined_lower.contains(&p)
            });
            return if matched { None } else { Some("no filter pattern matched") };
        }

        let keyword = config.story_keywords.iter().any(|k| {
            let k = k.to_lowercase();
            url_lower.contains(&k) || text_lower.contains(&k)
        });
        let title_like = text_len > limits.title_text_min && text_len < limits.title_text_max;
        let episode = EPISODE_PATTERN.is_match(&combined);

        if keyword || title_like || episode {
            None
        } else {
            Some("no story signal")
        }
    }
}
