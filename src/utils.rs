use rand::Rng;
use scraper::{ElementRef, Node};
use url::Url;

/// User agent rotation for avoiding detection
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

pub fn get_random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Elements whose boundaries become line breaks when rendering text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "section", "article", "main", "pre", "tr", "table", "hr",
];

const SILENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Render an element's text, turning block boundaries into newlines.
pub fn element_text(element: ElementRef) -> String {
    let mut out = String::new();
    push_text(element, &mut out);
    out
}

fn push_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SILENT_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    push_text(child_ref, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse every run of whitespace to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Drop the fragment so `page#a` and `page#b` dedupe to one URL.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Host without a leading `www.`, lowercased.
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Domain of a URL string, or an empty string if it does not parse.
pub fn domain_of_str(url: &str) -> String {
    Url::parse(url).map(|u| domain_of(&u)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_random_user_agent() {
        let agent = get_random_user_agent();
        assert!(!agent.is_empty());
        assert!(USER_AGENTS.contains(&agent));
    }

    #[test]
    fn test_element_text_breaks_blocks() {
        let html = Html::parse_fragment(
            "<div><p>First paragraph.</p><p>Second <b>bold</b> one.</p><script>var x;</script></div>",
        );
        let text = element_text(html.root_element());
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines, vec!["First paragraph.", "Second bold one."]);
    }

    #[test]
    fn test_normalize_url_strips_fragment() {
        let url = Url::parse("https://site.com/story/1#comments").unwrap();
        assert_eq!(normalize_url(&url), "https://site.com/story/1");
    }

    #[test]
    fn test_domain_of_ignores_www() {
        assert_eq!(domain_of_str("https://www.Site.com/a"), "site.com");
        assert_eq!(domain_of_str("not a url"), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(count_words("  one two\nthree "), 3);
    }
}
