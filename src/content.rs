//! Main-text extraction from web pages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::segments::limit_words;

pub const MAX_WORDS: usize = 3000;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Subtrees that never hold article text.
const NOISE: &str = "script, style, nav, header, footer, aside, .ad, .advertisement, .menu, .sidebar, .navigation";
const SEMANTIC_TAGS: &[&str] = &["main", "article", "[role=\"main\"]"];
const CONTENT_SELECTORS: &[&str] = &[
    ".mw-parser-output",
    ".content",
    ".post-content",
    ".article-content",
    ".entry-content",
    "#content",
    ".main-content",
];

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Request timeout while fetching URL: {0}")]
    Timeout(String),
    #[error("Connection error while fetching URL: {0}")]
    Connection(String),
    #[error("HTTP error {status} while fetching URL: {url}")]
    Status { status: u16, url: String },
    #[error("Failed to fetch URL: {0}")]
    Request(String),
}

/// Analyzable text plus a label describing where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub text: String,
    pub context: String,
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ContentError>;
}

pub struct HttpContentExtractor {
    http: Client,
}

impl HttpContentExtractor {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static("en-US,en;q=0.5"));
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    fn classify(url: &str, e: reqwest::Error) -> ContentError {
        if e.is_timeout() {
            ContentError::Timeout(url.to_string())
        } else if e.is_connect() {
            ContentError::Connection(url.to_string())
        } else if let Some(status) = e.status() {
            ContentError::Status { status: status.as_u16(), url: url.to_string() }
        } else {
            ContentError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl ContentExtractor for HttpContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ContentError> {
        tracing::info!(url, "fetching page");
        let body = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::classify(url, e))?
            .text()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let (text, words) = limit_words(&main_text(&body), MAX_WORDS);
        if words > MAX_WORDS {
            tracing::info!(url, words, "page text truncated to word budget");
        }
        tracing::info!(url, words, "page text extracted");
        Ok(ExtractedContent { text, context: format!("Content extracted from: {url}") })
    }
}

/// Whitespace-normalized main text of an HTML document.
pub fn main_text(html: &str) -> String {
    let mut doc = Html::parse_document(html);
    if let Ok(noise) = Selector::parse(NOISE) {
        let ids: Vec<_> = doc.select(&noise).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    let chosen = first_match(&doc, SEMANTIC_TAGS)
        .or_else(|| first_match(&doc, CONTENT_SELECTORS))
        .or_else(|| largest_div(&doc));
    match chosen {
        Some(el) => element_text(el),
        None => {
            tracing::debug!("no content container found, using whole document");
            element_text(doc.root_element())
        }
    }
}

fn first_match<'a>(doc: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| {
        let sel = Selector::parse(s).ok()?;
        let found = doc.select(&sel).next();
        if found.is_some() {
            tracing::debug!(selector = s, "content container found");
        }
        found
    })
}

fn largest_div(doc: &Html) -> Option<ElementRef<'_>> {
    let sel = Selector::parse("div").ok()?;
    let mut best: Option<(usize, ElementRef<'_>)> = None;
    for el in doc.select(&sel) {
        let len: usize = el.text().map(|t| t.trim().len()).sum();
        if best.as_ref().map_or(true, |(l, _)| len > *l) {
            best = Some((len, el));
        }
    }
    best.map(|(_, el)| el)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
