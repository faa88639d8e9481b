// src/config/mod.rs
//! Application configuration: `config/pulse.toml` plus env overrides.

pub mod sources;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

pub use sources::{SourceConfig, SourceKind};

pub const DEFAULT_CONFIG_PATH: &str = "config/pulse.toml";
pub const ENV_CONFIG_PATH: &str = "PULSE_CONFIG_PATH";
pub const ENV_CACHE_DIR: &str = "PULSE_CACHE_DIR";
pub const ENV_REFRESH_SECS: &str = "PULSE_REFRESH_SECS";
pub const ENV_PAGE_TTL_SECS: &str = "PULSE_PAGE_TTL_SECS";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Source names in page order. Sources not listed follow in file order.
    #[serde(default)]
    pub display_order: Vec<String>,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Topic Pulse".to_string(),
            description: "Latest posts about the topic, from every source we follow.".to_string(),
            keywords: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Yes,
    #[default]
    No,
}

impl StatusKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusKind::Yes => "yes",
            StatusKind::No => "no",
        }
    }
}

/// Per-status strings: one headline text, many messages to pick from.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusStrings {
    pub yes: Vec<String>,
    pub no: Vec<String>,
}

impl StatusStrings {
    pub fn for_status(&self, status: StatusKind) -> &[String] {
        match status {
            StatusKind::Yes => &self.yes,
            StatusKind::No => &self.no,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub current: StatusKind,
    pub messages: StatusStrings,
    pub texts: StatusStrings,
}

impl Default for StatusConfig {
    fn default() -> Self {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            current: StatusKind::No,
            messages: StatusStrings {
                no: strings(&["NO", "NOT YET", "NOPE", "STILL NO"]),
                yes: strings(&["YES, IT'S OUT"]),
            },
            texts: StatusStrings {
                no: strings(&["Not announced yet."]),
                yes: strings(&["It has been announced."]),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one snapshot file per source.
    pub dir: PathBuf,
    pub refresh_interval_secs: u64,
    /// How long a rendered page is served without touching the sources.
    pub page_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            refresh_interval_secs: 300,
            page_ttl_secs: 360,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("topic-pulse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing pulse config")?;
        for src in &mut cfg.sources {
            src.resolve_secrets()?;
        }
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load from `$PULSE_CONFIG_PATH`, else `config/pulse.toml`.
    pub fn load_default() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_file(path)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.cache.dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(v) = parse_u64_env(ENV_REFRESH_SECS) {
            self.cache.refresh_interval_secs = v;
        }
        if let Some(v) = parse_u64_env(ENV_PAGE_TTL_SECS) {
            self.cache.page_ttl_secs = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("no sources configured");
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                bail!("source with empty name");
            }
            if !s
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                bail!("source name '{}' must be [A-Za-z0-9_-]", s.name);
            }
            if !seen.insert(s.name.as_str()) {
                bail!("duplicate source name '{}'", s.name);
            }
            if !(-14 * 60..=14 * 60).contains(&s.utc_offset_minutes) {
                bail!("source '{}': utc_offset_minutes out of range", s.name);
            }
        }
        for n in &self.display_order {
            if !seen.contains(n.as_str()) {
                return Err(anyhow!("display_order names unknown source '{n}'"));
            }
        }
        if self.cache.refresh_interval_secs == 0 {
            bail!("cache.refresh_interval_secs must be > 0");
        }
        if self.status.messages.for_status(self.status.current).is_empty() {
            bail!("no status messages for '{}'", self.status.current.as_str());
        }
        Ok(())
    }
}

fn parse_u64_env(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
