use scraper::{ElementRef, Html};

/// Tags that never carry story text.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "nav", "header", "footer", "aside",
];

/// Class/id substrings that mark page chrome.
const NOISE_KEYWORDS: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "sponsor",
    "social",
    "share",
    "comment",
    "related",
    "breadcrumb",
    "tag-list",
    "tags",
    "author-bio",
    "newsletter",
    "popup",
    "modal",
    "cookie",
];

/// Whole class/id tokens that mark advertising.
const AD_TOKENS: &[&str] = &["ad", "ads"];

/// Class/id token prefixes that mark advertising.
const AD_TOKEN_PREFIXES: &[&str] = &["ad-", "ad_", "ads-", "ads_", "advert", "adsbygoogle"];

const NOISE_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary"];

/// Never removed, whatever their class says.
const PROTECTED_TAGS: &[&str] = &["html", "body"];

/// Removes navigation, ads, comments and other chrome from a document.
#[derive(Debug, Clone)]
pub struct BoilerplateFilter {
    tags: Vec<String>,
    keywords: Vec<String>,
}

impl Default for BoilerplateFilter {
    fn default() -> Self {
        Self {
            tags: NOISE_TAGS.iter().map(|s| s.to_string()).collect(),
            keywords: NOISE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BoilerplateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach every matching subtree in place and return how many were removed.
    ///
    /// Detached subtrees are unreachable from the root, so running the filter
    /// again removes nothing.
    pub fn apply(&self, document: &mut Html) -> usize {
        let mut stack = vec![document.root_element()];
        let mut doomed = Vec::new();

        while let Some(element) = stack.pop() {
            for child in element.child_elements() {
                if self.is_boilerplate(child) {
                    doomed.push(child.id());
                } else {
                    stack.push(child);
                }
            }
        }

        let removed = doomed.len();
        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        if removed > 0 {
            log::debug!("Removed {} boilerplate subtrees", removed);
        }
        removed
    }

    /// Filtered copy of `document`; the original is left untouched.
    pub fn filtered(&self, document: &Html) -> Html {
        let mut copy = document.clone();
        self.apply(&mut copy);
        copy
    }

    pub fn is_boilerplate(&self, element: ElementRef) -> bool {
        let el = element.value();
        let name = el.name();

        if PROTECTED_TAGS.contains(&name) {
            return false;
        }
        if self.tags.iter().any(|tag| tag == name) {
            return true;
        }
        if let Some(role) = el.attr("role") {
            if NOISE_ROLES.contains(&role.to_lowercase().as_str()) {
                return true;
            }
        }

        self.has_noise_attr(element)
    }

    /// Class or id contains one of the noise keywords or carries an ad token.
    pub fn has_noise_attr(&self, element: ElementRef) -> bool {
        let el = element.value();
        let attrs = format!(
            "{} {}",
            el.attr("class").unwrap_or_default(),
            el.attr("id").unwrap_or_default()
        )
        .to_lowercase();

        if attrs.trim().is_empty() {
            return false;
        }
        self.keywords.iter().any(|kw| attrs.contains(kw.as_str()))
            || attrs.split_whitespace().any(is_ad_token)
    }
}

fn is_ad_token(token: &str) -> bool {
    AD_TOKENS.contains(&token) || AD_TOKEN_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}
