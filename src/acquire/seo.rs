//! HTML metadata and robots.txt extraction.
//!
//! All HTML parsing is done using CSS selectors via the `scraper` crate.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

// CSS selector strings
const TITLE_SELECTOR_STR: &str = "title";
const META_DESCRIPTION_SELECTOR_STR: &str = "meta[name='description' i]";
const CANONICAL_SELECTOR_STR: &str = "link[rel='canonical' i]";
const META_ROBOTS_SELECTOR_STR: &str = "meta[name='robots' i]";

static TITLE_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| parse_selector(TITLE_SELECTOR_STR));
static META_DESCRIPTION_SELECTOR: Lazy<Option<Selector>> =
    Lazy::new(|| parse_selector(META_DESCRIPTION_SELECTOR_STR));
static CANONICAL_SELECTOR: Lazy<Option<Selector>> =
    Lazy::new(|| parse_selector(CANONICAL_SELECTOR_STR));
static META_ROBOTS_SELECTOR: Lazy<Option<Selector>> =
    Lazy::new(|| parse_selector(META_ROBOTS_SELECTOR_STR));

fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css)
        .map_err(|e| log::error!("Failed to parse selector '{}': {}", css, e))
        .ok()
}

/// Page metadata relevant to search engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlMetadata {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Canonical URL, resolved against the page URL
    pub canonical: Option<String>,
    pub robots_meta: Option<String>,
}

/// robots.txt facts. A missing or failing robots.txt is data, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RobotsInfo {
    pub present: bool,
    /// HTTP status of the robots.txt response, when one was received
    pub status: Option<u16>,
    pub sitemaps: Vec<String>,
}

/// Extracts title, description, canonical link and robots meta.
pub fn extract_html_metadata(html: &str, page_url: &str) -> HtmlMetadata {
    let document = Html::parse_document(html);

    let title = TITLE_SELECTOR
        .as_ref()
        .and_then(|s| document.select(s).next())
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let meta_description = meta_content(&document, &META_DESCRIPTION_SELECTOR);
    let robots_meta = meta_content(&document, &META_ROBOTS_SELECTOR);

    let canonical = CANONICAL_SELECTOR
        .as_ref()
        .and_then(|s| document.select(s).next())
        .and_then(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| match Url::parse(page_url).and_then(|base| base.join(href)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => href.to_string(),
        });

    HtmlMetadata {
        title,
        meta_description,
        canonical,
        robots_meta,
    }
}

fn meta_content(document: &Html, selector: &Lazy<Option<Selector>>) -> Option<String> {
    selector
        .as_ref()
        .and_then(|s| document.select(s).next())
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|c| !c.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collects `Sitemap:` URLs from a robots.txt body, in order, without duplicates.
pub fn extract_sitemaps(robots_txt: &str) -> Vec<String> {
    let mut sitemaps: Vec<String> = Vec::new();
    for line in robots_txt.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        if !field.trim().eq_ignore_ascii_case("sitemap") {
            continue;
        }
        let value = value.trim();
        if !value.is_empty() && !sitemaps.iter().any(|s| s == value) {
            sitemaps.push(value.to_string());
        }
    }
    sitemaps
}
