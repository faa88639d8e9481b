// src/config/sources.rs
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::ingest::dates::fixed_offset;
use crate::ingest::providers::{
    forum_api::ForumApiProvider,
    forum_html::ForumHtmlProvider,
    headline_api::HeadlineApiProvider,
    social_search::{SearchQuery, SocialSearchProvider},
};
use crate::ingest::transport::Transport;
use crate::ingest::types::SourceProvider;

fn default_count() -> u32 {
    30
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Also the snapshot file name.
    pub name: String,
    /// Heading shown on the page; defaults to `name`.
    #[serde(default)]
    pub title: String,
    /// Where readers can see the whole discussion.
    #[serde(default)]
    pub link: String,
    /// Offset of the source's local time, for formats without a zone.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    ForumApi {
        endpoint: String,
        permalink_base: String,
    },
    ForumHtml {
        endpoint: String,
    },
    SocialSearch {
        endpoint: String,
        query: String,
        #[serde(default)]
        lang: Option<String>,
        #[serde(default = "default_count")]
        count: u32,
        /// "ENV" means: read from `PULSE_<NAME>_TOKEN`.
        bearer_token: String,
    },
    HeadlineApi {
        endpoint: String,
        /// "ENV" means: read from `PULSE_<NAME>_TOKEN`.
        api_key: String,
    },
}

impl SourceConfig {
    /// Env var consulted when a secret is set to "ENV".
    pub fn secret_env_var(&self) -> String {
        format!(
            "PULSE_{}_TOKEN",
            self.name.to_ascii_uppercase().replace('-', "_")
        )
    }

    pub(crate) fn resolve_secrets(&mut self) -> Result<()> {
        if self.title.trim().is_empty() {
            self.title = self.name.clone();
        }
        let var = self.secret_env_var();
        let secret = match &mut self.kind {
            SourceKind::SocialSearch { bearer_token, .. } => bearer_token,
            SourceKind::HeadlineApi { api_key, .. } => api_key,
            _ => return Ok(()),
        };
        if secret.trim().eq_ignore_ascii_case("env") {
            *secret = env::var(&var)
                .map_err(|_| anyhow!("source '{}': missing {var} env var", self.name))?;
        }
        Ok(())
    }

    /// Build the provider for this source on top of a shared transport.
    pub fn build_provider(&self, transport: Arc<dyn Transport>) -> Arc<dyn SourceProvider> {
        let offset = fixed_offset(self.utc_offset_minutes);
        let name = self.name.clone();
        match &self.kind {
            SourceKind::ForumApi {
                endpoint,
                permalink_base,
            } => Arc::new(ForumApiProvider::new(
                name,
                endpoint.clone(),
                permalink_base.clone(),
                offset,
                transport,
            )),
            SourceKind::ForumHtml { endpoint } => Arc::new(ForumHtmlProvider::new(
                name,
                endpoint.clone(),
                offset,
                transport,
            )),
            SourceKind::SocialSearch {
                endpoint,
                query,
                lang,
                count,
                bearer_token,
            } => Arc::new(SocialSearchProvider::new(
                name,
                endpoint.clone(),
                SearchQuery {
                    q: query.clone(),
                    lang: lang.clone(),
                    count: *count,
                },
                bearer_token.clone(),
                transport,
            )),
            SourceKind::HeadlineApi { endpoint, api_key } => Arc::new(HeadlineApiProvider::new(
                name,
                endpoint.clone(),
                api_key.clone(),
                offset,
                transport,
            )),
        }
    }
}
