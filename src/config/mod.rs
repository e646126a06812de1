//! Site configuration (config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE: &str = "config.yml";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Content
    /// Route prefix every blog entry path must start with
    pub blog_prefix: String,
    /// Registry file listing the blog entries, relative to the base directory
    pub registry_file: String,
    /// Directory holding markdown sources, relative to the base directory
    pub content_dir: String,
    /// Directory holding static assets (images etc.), relative to the base directory
    pub assets_dir: String,
    /// Markdown source for the about page; the root route redirects to the
    /// blog listing when unset
    pub about_source: Option<String>,

    // Rendering
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Server
    #[serde(default)]
    pub server: ServerConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: "John Doe".to_string(),
            language: "en".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            blog_prefix: "/blogs".to_string(),
            registry_file: "blogs.yml".to_string(),
            content_dir: "content".to_string(),
            assets_dir: "assets".to_string(),
            about_source: None,

            highlight: HighlightConfig::default(),
            server: ServerConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Syntect theme name; must be one of the bundled default themes
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
        }
    }
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Folio");
        assert_eq!(config.blog_prefix, "/blogs");
        assert_eq!(config.registry_file, "blogs.yml");
        assert_eq!(config.highlight.theme, "base16-ocean.dark");
        assert_eq!(config.server.port, 4000);
        assert!(config.about_source.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Site
author: Test User
about_source: about.md
highlight:
  theme: base16-ocean.dark
  line_numbers: true
server:
  port: 8080
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Site");
        assert_eq!(config.author, "Test User");
        assert_eq!(config.about_source.as_deref(), Some("about.md"));
        assert!(config.highlight.line_numbers);
        assert_eq!(config.server.port, 8080);
        // Unlisted fields keep their defaults
        assert_eq!(config.blog_prefix, "/blogs");
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let yaml = "title: My Site\ngithub_username: someone\n";
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.extra.get("github_username").and_then(|v| v.as_str()),
            Some("someone")
        );
    }
}
