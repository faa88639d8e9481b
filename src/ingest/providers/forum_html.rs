// src/ingest/providers/forum_html.rs
//! Scrapes the forum's public topic pages instead of its JSON API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::{ParseError, SourceError};
use crate::ingest::dates::parse_forum_date;
use crate::ingest::providers::{last_two_pages, Page};
use crate::ingest::transport::{page_url, FetchRequest, Transport};
use crate::ingest::types::{Record, SourceProvider};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static PAGER: Lazy<Selector> = Lazy::new(|| selector("div.pager"));
static ENTRY_LIST: Lazy<Selector> = Lazy::new(|| selector("#entry-item-list"));
static ENTRY: Lazy<Selector> = Lazy::new(|| selector("#entry-item-list > li"));
static CONTENT: Lazy<Selector> = Lazy::new(|| selector(".content"));
static DATE_LINK: Lazy<Selector> = Lazy::new(|| selector("a.entry-date"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| selector("a.entry-author"));

pub struct ForumHtmlProvider {
    name: String,
    endpoint: String,
    offset: FixedOffset,
    transport: Arc<dyn Transport>,
}

impl ForumHtmlProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        offset: FixedOffset,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            offset,
            transport,
        }
    }

    async fn fetch_page(&self, n: u32) -> Result<Page, SourceError> {
        let url = page_url(&self.endpoint, n)?;
        let body = self
            .transport
            .get_text(&FetchRequest::get(url.clone()))
            .await?;
        Ok(parse_page(&body, &url, self.offset)?)
    }
}

/// Extract the page count and entries from one topic page.
///
/// A topic that fits on one page has no pager; that counts as one page.
pub fn parse_page(body: &str, page_url: &str, offset: FixedOffset) -> Result<Page, ParseError> {
    let base = Url::parse(page_url).map_err(|e| ParseError::Url(format!("{page_url}: {e}")))?;
    let doc = Html::parse_document(body);

    let page_count = match doc.select(&PAGER).next() {
        Some(pager) => pager
            .value()
            .attr("data-pagecount")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| ParseError::markup("pager without a numeric data-pagecount"))?,
        None => 1,
    };

    if doc.select(&ENTRY_LIST).next().is_none() {
        return Err(ParseError::markup("entry list not found"));
    }

    let entries = doc
        .select(&ENTRY)
        .map(|li| parse_entry(li, &base, offset))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        page_count,
        entries,
    })
}

fn parse_entry(li: ElementRef<'_>, base: &Url, offset: FixedOffset) -> Result<Record, ParseError> {
    let date_link = li
        .select(&DATE_LINK)
        .next()
        .ok_or_else(|| ParseError::markup("entry without a date link"))?;
    let href = date_link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::markup("date link without href"))?;
    let url = base
        .join(href)
        .map_err(|e| ParseError::Url(format!("{href}: {e}")))?;

    let date_text = date_link.text().collect::<String>();
    let date = parse_forum_date(date_text.trim(), offset)?;

    let text = li
        .select(&CONTENT)
        .next()
        .map(|c| c.inner_html().trim().to_string())
        .unwrap_or_default();

    let author = li
        .select(&AUTHOR)
        .next()
        .map(|a| a.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    Ok(Record {
        url: url.to_string(),
        text,
        date,
        author,
    })
}

#[async_trait]
impl SourceProvider for ForumHtmlProvider {
    async fn collect(&self) -> Result<Vec<Record>, SourceError> {
        let records = last_two_pages(|n| self.fetch_page(n)).await?;
        tracing::debug!(source = %self.name, records = records.len(), "forum pages scraped");
        Ok(records)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
