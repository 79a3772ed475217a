//! HTML parsing and link extraction
//!
//! Pulls followable links and, optionally, readable text out of a fetched
//! page. Parsing is synchronous: `scraper::Html` is not `Send`, so callers
//! parse inside a plain function and only carry the owned result across
//! `.await` points.

use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

use crate::utils::normalize_whitespace;

/// Links and text extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Absolute http(s) links in document order, fragments removed
    pub links: Vec<String>,

    /// Whitespace-normalized text of paragraphs and headings
    pub text: Vec<String>,
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("Invalid CSS selector: a[href]"))
}

fn text_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR
        .get_or_init(|| Selector::parse("p, h1, h2, h3").expect("Invalid CSS selector: p, h1, h2, h3"))
}

/// Parse a page, resolving links against `base_url`
pub fn parse_page(html: &str, base_url: &Url, extract_text: bool) -> ParsedPage {
    let document = Html::parse_document(html);

    let links = document
        .select(anchor_selector())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect();

    let text = if extract_text {
        collect_text(&document)
    } else {
        Vec::new()
    };

    ParsedPage { links, text }
}

fn collect_text(document: &Html) -> Vec<String> {
    document
        .select(text_selector())
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve an href to an absolute URL.
///
/// Returns `None` for empty and fragment-only hrefs, for `javascript:`,
/// `mailto:`, `tel:` and `data:` links, and for anything that does not
/// resolve to http or https.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}
