//! Content fetching
//!
//! Retrieves raw markdown for a content locator. A locator starting with
//! `http://` or `https://` is fetched over the network; anything else is a
//! path relative to the content directory. Fetching never parses markdown,
//! it only gets bytes into a string.

use reqwest::StatusCode;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("content locator is empty")]
    EmptyLocator,

    #[error("content file not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request to {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },
}

/// Fetches raw markdown from local files or http(s) URLs
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    content_dir: PathBuf,
}

impl ContentFetcher {
    pub fn new(content_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            content_dir,
        }
    }

    /// Whether a locator names a remote resource
    pub fn is_remote(locator: &str) -> bool {
        locator.starts_with("http://") || locator.starts_with("https://")
    }

    /// Fetch the raw markdown a locator points at
    pub async fn fetch(&self, locator: &str) -> Result<String, FetchError> {
        if locator.trim().is_empty() {
            return Err(FetchError::EmptyLocator);
        }
        if Self::is_remote(locator) {
            self.fetch_remote(locator).await
        } else {
            self.fetch_local(locator).await
        }
    }

    /// Resolve a local locator to its path under the content directory.
    /// Root, drive-prefix and parent components would escape it, so such
    /// locators resolve to nothing.
    pub fn local_path(&self, locator: &str) -> Option<PathBuf> {
        let relative = Path::new(locator);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.content_dir.join(relative))
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_local(&self, locator: &str) -> Result<String, FetchError> {
        let Some(path) = self.local_path(locator) else {
            return Err(FetchError::NotFound(locator.to_string()));
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(locator.to_string()))
            }
            Err(source) => Err(FetchError::Io { path, source }),
        }
    }
}
