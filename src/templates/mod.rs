//! Built-in theme templates using the Tera template engine
//!
//! The whole theme is embedded in the binary, so a site needs nothing on
//! disk beyond its config, registry and content.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;

/// Stylesheet served at /style.css
pub const STYLESHEET: &str = include_str!("theme/style.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all theme templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Disable autoescaping: article bodies are rendered HTML and the
        // remaining fields come from the author's own registry
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("article.html", include_str!("theme/article.html")),
            ("about.html", include_str!("theme/about.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
        ])?;

        tera.register_filter("date_format", date_format_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Site-wide fields every template can reach as `site.*`
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub blog_prefix: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
            blog_prefix: config.blog_prefix.clone(),
        }
    }
}

/// Context preloaded with the fields layout.html expects
pub fn base_context(site: &SiteData) -> Context {
    let mut context = Context::new();
    context.insert("site", site);
    context.insert(
        "current_year",
        &chrono::Local::now().format("%Y").to_string(),
    );
    context
}

/// Tera filter: format date string
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "YYYY-MM-DD".to_string(),
    };

    // Dates arrive as "2025-01-18"; "LL" turns them into "January 18, 2025"
    if format == "LL" {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            return Ok(tera::Value::String(date.format("%B %d, %Y").to_string()));
        }
    }

    Ok(tera::Value::String(s))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => " .....".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ListingItem;

    fn site() -> SiteData {
        SiteData::from_config(&SiteConfig::default())
    }

    #[test]
    fn test_all_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_render_index_with_items() {
        let renderer = TemplateRenderer::new().unwrap();
        let items = vec![ListingItem {
            title: "Building a REST API with FastAPI".to_string(),
            date: "2025-01-19".to_string(),
            path: "/blogs/fastapi".to_string(),
            summary: Some("A short tour.".to_string()),
            image: Some("/assets/fastapi.png".to_string()),
        }];
        let mut context = base_context(&site());
        context.insert("items", &items);

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains(r#"href="/blogs/fastapi""#));
        assert!(html.contains("Building a REST API with FastAPI"));
        assert!(html.contains("January 19, 2025"));
        assert!(html.contains("/assets/fastapi.png"));
    }

    #[test]
    fn test_render_index_empty() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context(&site());
        context.insert("items", &Vec::<ListingItem>::new());
        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("Nothing published yet"));
    }

    #[test]
    fn test_render_article_body() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context(&site());
        context.insert("title", "Hello");
        context.insert("date", "2025-01-18");
        context.insert("path", "/blogs/hello");
        context.insert("error", &tera::Value::Null);
        context.insert("body", "<p>rendered body</p>");

        let html = renderer.render("article.html", &context).unwrap();
        assert!(html.contains("<p>rendered body</p>"));
        assert!(html.contains("January 18, 2025"));
        assert!(!html.contains("Failed to load"));
    }

    #[test]
    fn test_render_article_failure() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context(&site());
        context.insert("title", "Hello");
        context.insert("date", "2025-01-18");
        context.insert("path", "/blogs/hello");
        context.insert("error", "content file not found: hello.md");
        context.insert("body", "");

        let html = renderer.render("article.html", &context).unwrap();
        assert!(html.contains("Failed to load this article"));
        assert!(html.contains("content file not found: hello.md"));
    }

    #[test]
    fn test_render_not_found() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = base_context(&site());
        context.insert("request_path", "/blogs/nope");
        let html = renderer.render("not_found.html", &context).unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("/blogs/nope"));
    }

    #[test]
    fn test_truncate_long_summary() {
        let renderer = TemplateRenderer::new().unwrap();
        let long = "word ".repeat(100);
        let items = vec![ListingItem {
            title: "Long".to_string(),
            date: "2025-01-18".to_string(),
            path: "/blogs/long".to_string(),
            summary: Some(long),
            image: None,
        }];
        let mut context = base_context(&site());
        context.insert("items", &items);
        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("....."));
    }
}
