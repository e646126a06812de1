//! Blog content registry
//!
//! The registry is the static, ordered list of blog entries the whole site
//! is built from. It is loaded once at startup from a YAML file, validated,
//! and never mutated afterwards; reloading produces a fresh `Registry`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One blog article's static metadata plus its content locator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogEntry {
    /// Display title
    pub title: String,

    /// Publication date; listing order only, not identity
    pub date: NaiveDate,

    /// Route path, unique across the registry, e.g. `/blogs/hello-world`
    pub path: String,

    /// Short preview text for the listing
    #[serde(default)]
    pub summary: Option<String>,

    /// Cover image locator for the listing
    #[serde(default)]
    pub image: Option<String>,

    /// Content locator: a file path under the content directory, or an
    /// http(s) URL returning raw markdown
    pub source: String,
}

impl BlogEntry {
    /// Display slug derived from the last path segment
    pub fn slug(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }
}

/// Registry loading and validation errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read registry {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse registry {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("entry {index} has an empty title")]
    EmptyTitle { index: usize },

    #[error("entry {title:?} has an empty content source")]
    EmptySource { title: String },

    #[error("entry {title:?} has path {path:?} outside the blog prefix {prefix:?}")]
    PathOutsidePrefix {
        title: String,
        path: String,
        prefix: String,
    },
}

/// The static, ordered content registry
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<BlogEntry>,
}

impl Registry {
    /// Load and validate a registry from a YAML file
    pub fn load(path: &Path, blog_prefix: &str) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<BlogEntry> =
            serde_yaml::from_str(&content).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_entries(entries, blog_prefix)
    }

    /// Build a registry from already-parsed entries, validating each one.
    /// Entry order is preserved as authored; sources are trimmed so every
    /// consumer sees the same locator string.
    pub fn from_entries(
        mut entries: Vec<BlogEntry>,
        blog_prefix: &str,
    ) -> Result<Self, RegistryError> {
        let prefix = blog_prefix.trim_end_matches('/');
        for (index, entry) in entries.iter_mut().enumerate() {
            if entry.title.trim().is_empty() {
                return Err(RegistryError::EmptyTitle { index });
            }
            entry.source = entry.source.trim().to_string();
            if entry.source.is_empty() {
                return Err(RegistryError::EmptySource {
                    title: entry.title.clone(),
                });
            }
            // The prefix must end at a path-segment boundary: /blogs owns
            // /blogs/x but not /blogsmith, and the bare prefix is the
            // listing page, not an entry
            let under_prefix = entry
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1);
            if !under_prefix {
                return Err(RegistryError::PathOutsidePrefix {
                    title: entry.title.clone(),
                    path: entry.path.clone(),
                    prefix: blog_prefix.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Entries in authored order; re-iterable without side effects
    pub fn entries(&self) -> impl Iterator<Item = &BlogEntry> + '_ {
        self.entries.iter()
    }

    /// Entry by registry index
    pub fn get(&self, index: usize) -> Option<&BlogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in listing order: date descending, ties keeping authored
    /// order. ISO dates sort chronologically and lexically alike, so this
    /// matches a string sort on the authored dates.
    pub fn by_listing_order(&self) -> Vec<&BlogEntry> {
        let mut sorted: Vec<&BlogEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }
}
