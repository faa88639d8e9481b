// src/ingest/providers/forum_api.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::{ParseError, SourceError};
use crate::ingest::dates::parse_forum_date;
use crate::ingest::providers::{last_two_pages, Page};
use crate::ingest::transport::{page_url, FetchRequest, Transport};
use crate::ingest::types::{Record, SourceProvider};

#[derive(Debug, Deserialize)]
struct ApiPage {
    page_count: Loose,
    #[serde(default)]
    entry_detail_models: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    entry_id: Loose,
    content: String,
    date: String,
    #[serde(default)]
    author: String,
}

/// The API is inconsistent about numbers vs numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Num(u64),
    Str(String),
}

impl Loose {
    fn as_string(&self) -> String {
        match self {
            Loose::Num(n) => n.to_string(),
            Loose::Str(s) => s.trim().to_string(),
        }
    }

    fn as_u32(&self) -> Option<u32> {
        match self {
            Loose::Num(n) => u32::try_from(*n).ok(),
            Loose::Str(s) => s.trim().parse().ok(),
        }
    }
}

/// Paginated JSON forum API: `GET {endpoint}?page=N`.
pub struct ForumApiProvider {
    name: String,
    endpoint: String,
    permalink_base: String,
    offset: FixedOffset,
    transport: Arc<dyn Transport>,
}

impl ForumApiProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        permalink_base: impl Into<String>,
        offset: FixedOffset,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            permalink_base: permalink_base.into(),
            offset,
            transport,
        }
    }

    async fn fetch_page(&self, n: u32) -> Result<Page, SourceError> {
        let url = page_url(&self.endpoint, n)?;
        let req = FetchRequest::get(url).header("accept", "application/json");
        let body = self.transport.get_text(&req).await?;
        Ok(parse_page(&body, &self.permalink_base, self.offset)?)
    }
}

/// Decode one API page into records (source order, text not normalized).
pub fn parse_page(
    body: &str,
    permalink_base: &str,
    offset: FixedOffset,
) -> Result<Page, ParseError> {
    let page: ApiPage = serde_json::from_str(body)?;
    let page_count = page
        .page_count
        .as_u32()
        .ok_or_else(|| ParseError::markup("page_count is not a page number"))?;

    let base = permalink_base.trim_end_matches('/');
    let entries = page
        .entry_detail_models
        .into_iter()
        .map(|e| {
            Ok(Record {
                url: format!("{}/{}", base, e.entry_id.as_string()),
                date: parse_forum_date(&e.date, offset)?,
                text: e.content,
                author: e.author,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(Page {
        page_count,
        entries,
    })
}

#[async_trait]
impl SourceProvider for ForumApiProvider {
    async fn collect(&self) -> Result<Vec<Record>, SourceError> {
        let records = last_two_pages(|n| self.fetch_page(n)).await?;
        tracing::debug!(source = %self.name, records = records.len(), "forum api collected");
        Ok(records)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::dates::fixed_offset;

    #[test]
    fn parses_entries_and_string_page_count() {
        let body = r#"{
            "page_count": "12",
            "entry_detail_models": [
                {"entry_id": 1001, "content": "first", "date": "14.02.2016 13:20", "author": "ayse"},
                {"entry_id": "1002", "content": "second", "date": "14.02.2016 13:25 ~ 13:40", "author": "mehmet"}
            ]
        }"#;
        let page = parse_page(body, "https://forum.example/entry/", fixed_offset(0)).unwrap();
        assert_eq!(page.page_count, 12);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].url, "https://forum.example/entry/1001");
        assert_eq!(page.entries[1].url, "https://forum.example/entry/1002");
        assert_eq!(page.entries[1].author, "mehmet");
        assert_eq!(page.entries[1].date - page.entries[0].date, 5 * 60 * 1000);
    }

    #[test]
    fn malformed_bodies_are_parse_errors() {
        let off = fixed_offset(0);
        assert!(matches!(
            parse_page("<html>", "https://f.example/entry", off),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_page(r#"{"page_count":"many"}"#, "https://f.example/entry", off),
            Err(ParseError::Markup(_))
        ));
        let bad_date = r#"{"page_count":1,"entry_detail_models":[{"entry_id":1,"content":"x","date":"soon","author":""}]}"#;
        assert!(matches!(
            parse_page(bad_date, "https://f.example/entry", off),
            Err(ParseError::Date(_))
        ));
    }
}
