//! Reduces an article page to a bounded run of plain text.
//!
//! # Pipeline
//!
//! 1. Parse the markup with `scraper` (html5ever, lenient)
//! 2. Detach every boilerplate node matched by [`SELECTORS_TO_REMOVE`]
//! 3. Keep the first `main`/`article`/`[role="main"]` region, else `<body>`
//! 4. Concatenate its text nodes in document order
//! 5. Collapse whitespace runs to one space, trim, cap at `max_length` chars
//!
//! # Rejected input
//!
//! html5ever accepts any byte soup, so "cannot be parsed" means two things
//! here: the body is empty or whitespace-only, or the server said it is not
//! a markup or text document (PDFs, images, JSON). Both are
//! [`RunError::Parse`] so the run stops instead of summarizing garbage.

use crate::constants::{MAIN_CONTENT_SELECTORS, SELECTORS_TO_REMOVE};
use crate::error::{Result, RunError};
use crate::models::{ExtractedContent, RankedItem};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&SELECTORS_TO_REMOVE.iter().join(", ")).expect("noise selectors are valid CSS")
});

static MAIN_CONTENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&MAIN_CONTENT_SELECTORS.iter().join(", "))
        .expect("main content selectors are valid CSS")
});

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body is valid CSS"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Media types whose bodies are worth parsing as markup.
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
    "text/plain",
];

/// Turn raw markup into at most `max_length` characters of plain text.
///
/// Pure: the same markup and limit always give the same output. The result
/// never starts or ends with whitespace and never holds two whitespace
/// characters in a row.
///
/// # Errors
///
/// [`RunError::Parse`] if `raw_markup` is empty or only whitespace.
pub fn extract(raw_markup: &str, max_length: usize) -> Result<String> {
    if raw_markup.trim().is_empty() {
        return Err(RunError::Parse("document is empty".to_string()));
    }

    let mut document = Html::parse_document(raw_markup);
    strip_noise(&mut document);

    let root = document.root_element();
    let region = root
        .select(&MAIN_CONTENT)
        .next()
        .or_else(|| root.select(&BODY).next())
        .unwrap_or(root);

    Ok(normalize(&region_text(region), max_length))
}

/// Detach boilerplate subtrees so none of their text is reachable.
fn strip_noise(document: &mut Html) {
    let doomed: Vec<_> = document
        .root_element()
        .select(&NOISE)
        .map(|el| el.id())
        .collect();
    debug!(removed = doomed.len(), "Stripping boilerplate nodes");

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn region_text(region: ElementRef<'_>) -> String {
    region.text().collect::<String>()
}

/// Collapse whitespace runs, trim, then cut to `max_length` characters.
///
/// The cut can land right after a space, so trailing whitespace is trimmed
/// once more.
fn normalize(text: &str, max_length: usize) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let trimmed = collapsed.trim();
    match trimmed.char_indices().nth(max_length) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Whether a `Content-Type` header value names a parseable document.
fn is_markup(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Story links are user-submitted; only web URLs are fetched.
fn article_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| RunError::Fetch(format!("invalid article URL {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RunError::Fetch(format!("unsupported {scheme} URL {raw}"))),
    }
}

/// Download the page at `url` as text.
///
/// # Errors
///
/// - [`RunError::Fetch`] on a malformed or non-web URL, transport failure,
///   or a non-success status
/// - [`RunError::Parse`] if the response declares a non-document media type
#[instrument(level = "info", skip(client))]
pub async fn fetch_markup(client: &Client, url: &str) -> Result<String> {
    let t0 = Instant::now();
    let response = client.get(article_url(url)?).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(RunError::Fetch(format!("GET {url} returned {status}")));
    }

    if let Some(content_type) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_markup(content_type) {
            warn!(%content_type, "Refusing to extract non-markup document");
            return Err(RunError::Parse(format!(
                "{url} served {content_type}, not a markup document"
            )));
        }
    }

    let body = response.text().await?;
    info!(
        bytes = body.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetched article markup"
    );
    Ok(body)
}

/// Fetch and extract the selected item's article.
///
/// Items without a URL (Ask HN and friends) skip the network entirely and
/// carry empty content.
#[instrument(level = "info", skip_all, fields(id = %item.id))]
pub async fn extract_item(
    client: &Client,
    item: &RankedItem,
    max_length: usize,
) -> Result<ExtractedContent> {
    let title = item.title.clone().unwrap_or_default();
    let Some(url) = item.url.clone() else {
        info!("Item has no URL; skipping extraction");
        return Ok(ExtractedContent {
            title,
            url: None,
            content: String::new(),
        });
    };

    let markup = fetch_markup(client, &url).await?;
    let content = extract(&markup, max_length)?;
    info!(chars = content.chars().count(), "Extracted article text");

    Ok(ExtractedContent {
        title,
        url: Some(url),
        content,
    })
}
