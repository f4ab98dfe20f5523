//! HTML parser for index pages and article bodies
//!
//! This module handles parsing HTML content to extract:
//! - Section links from the index navigation table
//! - Article links from `div.mw-allpages-body`
//! - The next-page link from `div.mw-allpages-nav`
//! - Concatenated paragraph text from article pages

use crate::{ConfigError, HarvestError};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));
static ALLPAGES_BODY_ANCHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.mw-allpages-body a[href]").expect("hardcoded selector is valid")
});
static ALLPAGES_NAV_ANCHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.mw-allpages-nav a[href]").expect("hardcoded selector is valid")
});
static PARAGRAPH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("hardcoded selector is valid"));

/// An anchor found in an index listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Trimmed anchor text, used as the document identifier
    pub title: String,

    /// Absolute link target
    pub url: Url,
}

/// Parses a user-supplied CSS selector
pub fn parse_selector(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| {
        HarvestError::Config(ConfigError::InvalidSelector(format!(
            "'{}': {:?}",
            selector, e
        )))
    })
}

/// Extracts the section links from the index navigation table
///
/// # Returns
///
/// * `None` - No element matches `table_selector`
/// * `Some(links)` - Resolved anchors of the first matching table (possibly empty)
pub fn extract_index_sections(html: &str, table_selector: &Selector, base_url: &Url) -> Option<Vec<Url>> {
    let document = Html::parse_document(html);
    let table = document.select(table_selector).next()?;

    let links = table
        .select(&ANCHOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect();

    Some(links)
}

/// Extracts article candidates from an AllPages listing
///
/// Anchors with empty text are skipped; duplicates are kept in document order so the
/// caller decides which one wins.
pub fn extract_allpages_links(html: &str, base_url: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    collect_candidates(&document, base_url)
}

/// Extracts the next-page link from an AllPages listing
///
/// The navigation block holds "previous" and "next" anchors. Only when exactly two
/// anchors are present is the second one taken as the next page.
pub fn extract_next_page(html: &str, base_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    next_page_link(&document, base_url)
}

/// Parses an AllPages listing once and returns its candidates and next-page link
pub fn parse_allpages(html: &str, base_url: &Url) -> (Vec<Candidate>, Option<Url>) {
    let document = Html::parse_document(html);
    (
        collect_candidates(&document, base_url),
        next_page_link(&document, base_url),
    )
}

/// Returns the text of every `<p>` element, joined by newlines
///
/// A page without paragraphs yields an empty string.
pub fn extract_paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);

    document
        .select(&PARAGRAPH)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_candidates(document: &Html, base_url: &Url) -> Vec<Candidate> {
    document
        .select(&ALLPAGES_BODY_ANCHOR)
        .filter_map(|anchor| candidate_from_anchor(anchor, base_url))
        .collect()
}

fn candidate_from_anchor(anchor: ElementRef<'_>, base_url: &Url) -> Option<Candidate> {
    let title = anchor.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        return None;
    }

    let url = resolve_link(anchor.value().attr("href")?, base_url)?;
    Some(Candidate { title, url })
}

fn next_page_link(document: &Html, base_url: &Url) -> Option<Url> {
    let nav: Vec<&str> = document
        .select(&ALLPAGES_NAV_ANCHOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .collect();

    if nav.len() != 2 {
        return None;
    }

    resolve_link(nav[1], base_url)
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}
