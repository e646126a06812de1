//! folio: a registry-driven blog server
//!
//! A site is a YAML registry of blog entries plus the markdown they point
//! at, local or remote. folio resolves routes against the registry,
//! fetches and renders content on demand with syntax highlighting and TOC
//! injection, and serves the result with an embedded theme.

pub mod commands;
pub mod config;
pub mod fetch;
pub mod registry;
pub mod render;
pub mod routes;
pub mod server;
pub mod templates;
pub mod view;

use anyhow::Result;
use std::path::{Path, PathBuf};

use config::{SiteConfig, CONFIG_FILE};

/// A site rooted at a directory: its config plus derived paths
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory; a missing config file means defaults
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            SiteConfig::load(&config_path)?
        } else {
            SiteConfig::default()
        };

        Ok(Self { config, base_dir })
    }

    /// Path of the registry file
    pub fn registry_path(&self) -> PathBuf {
        self.base_dir.join(&self.config.registry_file)
    }

    /// Directory local content locators resolve against
    pub fn content_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.content_dir)
    }

    /// Directory served under /assets
    pub fn assets_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.assets_dir)
    }
}
