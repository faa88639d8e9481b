// src/ingest/providers/social_search.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ParseError, SourceError};
use crate::ingest::dates::parse_social_date;
use crate::ingest::transport::{with_query, FetchRequest, Transport};
use crate::ingest::types::{Record, SourceProvider};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    statuses: Vec<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    id_str: String,
    text: String,
    created_at: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    screen_name: String,
}

/// Search query sent on every collect.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub q: String,
    pub lang: Option<String>,
    pub count: u32,
}

/// Social-media search API authenticated with a bearer token.
pub struct SocialSearchProvider {
    name: String,
    endpoint: String,
    query: SearchQuery,
    bearer_token: String,
    transport: Arc<dyn Transport>,
}

impl SocialSearchProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        query: SearchQuery,
        bearer_token: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            query,
            bearer_token: bearer_token.into(),
            transport,
        }
    }

    fn request(&self) -> Result<FetchRequest, ParseError> {
        let count = self.query.count.to_string();
        let mut pairs = vec![("q", self.query.q.as_str()), ("count", count.as_str())];
        if let Some(lang) = self.query.lang.as_deref() {
            pairs.push(("lang", lang));
        }
        let url = with_query(&self.endpoint, &pairs)?;
        Ok(FetchRequest::get(url)
            .header("accept", "application/json")
            .header("authorization", format!("Bearer {}", self.bearer_token)))
    }
}

/// Decode a search response; output is oldest first.
pub fn parse_statuses(body: &str) -> Result<Vec<Record>, ParseError> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    let mut out = resp
        .statuses
        .into_iter()
        .map(|s| {
            Ok(Record {
                url: format!(
                    "https://twitter.com/{}/status/{}",
                    s.user.screen_name, s.id_str
                ),
                date: parse_social_date(&s.created_at)?,
                text: s.text,
                author: s.user.screen_name,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;
    out.sort_by_key(|r| r.date);
    Ok(out)
}

#[async_trait]
impl SourceProvider for SocialSearchProvider {
    async fn collect(&self) -> Result<Vec<Record>, SourceError> {
        let req = self.request()?;
        let body = self.transport.get_text(&req).await?;
        Ok(parse_statuses(&body)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
