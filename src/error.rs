// src/error.rs
//! Error taxonomy for collecting, caching and refreshing sources.
//!
//! Adapters fail with [`SourceError`] (either a [`FetchError`] or a
//! [`ParseError`]). The cache manager attributes that failure to a named
//! source as a [`CollectError`]. [`StorageError`] never escapes `get()`:
//! a broken cache file just means "fetch again".

use std::path::PathBuf;

use thiserror::Error;

/// Transport or status failure while talking to a remote endpoint.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Fixture transport has no body registered for the URL.
    #[error("no fixture registered for {0}")]
    MissingFixture(String),

    /// The task running the fetch was cancelled before it finished.
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

/// Response body did not have the expected shape.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected markup: {0}")]
    Markup(String),

    #[error("unparseable date '{0}'")]
    Date(String),

    #[error("invalid endpoint URL: {0}")]
    Url(String),
}

impl ParseError {
    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup(message.into())
    }

    pub fn date(raw: impl Into<String>) -> Self {
        Self::Date(raw.into())
    }
}

/// Everything an adapter's `collect()` can fail with.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A failed collect, attributed to one named source.
#[derive(Error, Debug)]
#[error("source '{source_name}' failed: {cause}")]
pub struct CollectError {
    pub source_name: String,
    #[source]
    pub cause: SourceError,
}

impl CollectError {
    pub fn new(source_name: impl Into<String>, cause: SourceError) -> Self {
        Self {
            source_name: source_name.into(),
            cause,
        }
    }
}

/// Durable snapshot read/write failure.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
