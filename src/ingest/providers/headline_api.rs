// src/ingest/providers/headline_api.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::{ParseError, SourceError};
use crate::ingest::dates::parse_iso_date;
use crate::ingest::transport::{FetchRequest, Transport};
use crate::ingest::types::{Record, SourceProvider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HeadlineList {
    list: Vec<Headline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Headline {
    url: String,
    #[serde(default)]
    description: String,
    start_date: String,
}

/// News headline API keyed by an `apikey` header. Headlines carry no author.
pub struct HeadlineApiProvider {
    name: String,
    endpoint: String,
    api_key: String,
    offset: FixedOffset,
    transport: Arc<dyn Transport>,
}

impl HeadlineApiProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        offset: FixedOffset,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            offset,
            transport,
        }
    }
}

/// Decode the headline list; output is oldest first.
pub fn parse_headlines(body: &str, offset: FixedOffset) -> Result<Vec<Record>, ParseError> {
    let list: HeadlineList = serde_json::from_str(body)?;
    let mut out = list
        .list
        .into_iter()
        .map(|h| {
            Ok(Record {
                date: parse_iso_date(&h.start_date, offset)?,
                url: h.url,
                text: h.description,
                author: String::new(),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;
    out.sort_by_key(|r| r.date);
    Ok(out)
}

#[async_trait]
impl SourceProvider for HeadlineApiProvider {
    async fn collect(&self) -> Result<Vec<Record>, SourceError> {
        let req = FetchRequest::get(self.endpoint.clone())
            .header("accept", "application/json")
            .header("apikey", self.api_key.clone());
        let body = self.transport.get_text(&req).await?;
        Ok(parse_headlines(&body, self.offset)?)
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
    fn parses_and_sorts_headlines() {
        let body = r#"{"Count":2,"List":[
            {"Id":"2","Url":"https://news.example/b","Description":"later","StartDate":"2018-06-25T10:00:00Z"},
            {"Id":"1","Url":"https://news.example/a","Description":"earlier","StartDate":"2018-06-25T09:00:00"}
        ]}"#;
        let out = parse_headlines(body, fixed_offset(0)).unwrap();
        assert_eq!(out[0].url, "https://news.example/a");
        assert_eq!(out[1].text, "later");
        assert!(out.iter().all(|r| r.author.is_empty()));
        assert_eq!(out[1].date - out[0].date, 3600 * 1000);
    }

    #[test]
    fn missing_list_is_a_parse_error() {
        assert!(matches!(
            parse_headlines(r#"{"Error":"quota"}"#, fixed_offset(0)),
            Err(ParseError::Json(_))
        ));
    }
}
