// src/ingest/transport.rs
//! Network seam for providers: real HTTP via reqwest, or in-memory fixtures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{FetchError, ParseError};

/// A GET request with optional extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body of a successful (2xx) response as text.
    async fn get_text(&self, req: &FetchRequest) -> Result<String, FetchError>;
}

/// reqwest-backed transport shared by all providers.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, req: &FetchRequest) -> Result<String, FetchError> {
        let mut builder = self.client.get(&req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(error = ?e, url = %req.url, "provider http error");
            FetchError::Transport {
                url: req.url.clone(),
                source: e,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: req.url.clone(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Transport {
            url: req.url.clone(),
            source: e,
        })
    }
}

/// Serves canned bodies keyed by URL and records every request it sees.
#[derive(Default)]
pub struct FixtureTransport {
    bodies: HashMap<String, String>,
    pub requests: Mutex<Vec<FetchRequest>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("fixture mutex poisoned")
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, req: &FetchRequest) -> Result<String, FetchError> {
        self.requests
            .lock()
            .expect("fixture mutex poisoned")
            .push(req.clone());
        self.bodies
            .get(&req.url)
            .cloned()
            .ok_or_else(|| FetchError::MissingFixture(req.url.clone()))
    }
}

/// Append query pairs to an endpoint URL.
pub fn with_query(endpoint: &str, pairs: &[(&str, &str)]) -> Result<String, ParseError> {
    let mut url = Url::parse(endpoint).map_err(|e| ParseError::Url(format!("{endpoint}: {e}")))?;
    {
        let mut q = url.query_pairs_mut();
        for (k, v) in pairs {
            q.append_pair(k, v);
        }
    }
    Ok(url.to_string())
}

/// URL of page `n` of a paginated endpoint.
pub fn page_url(endpoint: &str, page: u32) -> Result<String, ParseError> {
    with_query(endpoint, &[("page", &page.to_string())])
}
