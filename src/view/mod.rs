//! Listing and article views
//!
//! Projections of the registry for presentation. The listing is a plain
//! date-descending snapshot. The detail view owns the fetch-then-render
//! lifecycle for one article and guards against a slow fetch for a
//! previously shown article landing on a newer one: a result is applied
//! only if its locator still matches the view's current entry.

use crate::fetch::{ContentFetcher, FetchError};
use crate::registry::{BlogEntry, Registry};
use crate::render::MarkdownRenderer;
use serde::Serialize;

/// One row of the blog listing
#[derive(Debug, Clone, Serialize)]
pub struct ListingItem {
    pub title: String,
    pub date: String,
    pub path: String,
    pub summary: Option<String>,
    pub image: Option<String>,
}

/// Snapshot of the registry in listing order, newest first
pub fn listing(registry: &Registry) -> Vec<ListingItem> {
    registry
        .by_listing_order()
        .into_iter()
        .map(|entry| ListingItem {
            title: entry.title.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            path: entry.path.clone(),
            summary: entry.summary.clone(),
            image: entry.image.clone(),
        })
        .collect()
}

/// A fully rendered article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub date: String,
    pub path: String,
    pub html: String,
}

impl Article {
    fn from_entry(entry: &BlogEntry, html: String) -> Self {
        Self {
            title: entry.title.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            path: entry.path.clone(),
            html,
        }
    }
}

/// Lifecycle of one article view
#[derive(Debug, Clone)]
pub enum ViewState {
    /// Bound to an entry, nothing fetched yet
    Idle,
    /// A fetch for the current entry's locator is in flight
    Fetching,
    /// Content fetched and rendered
    Rendered(Article),
    /// The fetch failed; the message is user-presentable
    Failed { message: String },
}

/// What applying a fetch result did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Rendered,
    Failed,
    /// The result belonged to a locator the view no longer shows
    Stale,
}

/// Detail view for a single blog entry
#[derive(Debug, Clone)]
pub struct DetailView {
    entry: BlogEntry,
    state: ViewState,
}

impl DetailView {
    pub fn new(entry: BlogEntry) -> Self {
        Self {
            entry,
            state: ViewState::Idle,
        }
    }

    pub fn entry(&self) -> &BlogEntry {
        &self.entry
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Start a fetch cycle, returning the locator to fetch
    pub fn begin_fetch(&mut self) -> String {
        self.state = ViewState::Fetching;
        self.entry.source.clone()
    }

    /// Point the view at another entry. If the content locator is
    /// unchanged only the metadata updates and no refetch is needed;
    /// otherwise the view returns the new locator to fetch.
    pub fn rebind(&mut self, entry: BlogEntry) -> Option<String> {
        let same_source = entry.source == self.entry.source;
        self.entry = entry;
        if same_source && !matches!(self.state, ViewState::Idle) {
            if let ViewState::Rendered(article) = &mut self.state {
                let html = std::mem::take(&mut article.html);
                *article = Article::from_entry(&self.entry, html);
            }
            return None;
        }
        Some(self.begin_fetch())
    }

    /// Apply the outcome of a fetch. Results for a locator the view has
    /// moved away from are dropped unapplied.
    pub fn apply_fetch(
        &mut self,
        locator: &str,
        outcome: Result<String, FetchError>,
        renderer: &MarkdownRenderer,
    ) -> Applied {
        if locator != self.entry.source {
            return Applied::Stale;
        }
        match outcome {
            Ok(markdown) => {
                let rendered = renderer.render(&markdown);
                self.state = ViewState::Rendered(Article::from_entry(&self.entry, rendered.html));
                Applied::Rendered
            }
            Err(err) => {
                self.state = ViewState::Failed {
                    message: err.to_string(),
                };
                Applied::Failed
            }
        }
    }

    /// Run one full fetch-and-render cycle for the current entry
    pub async fn load(
        &mut self,
        fetcher: &ContentFetcher,
        renderer: &MarkdownRenderer,
    ) -> Applied {
        let locator = self.begin_fetch();
        let outcome = fetcher.fetch(&locator).await;
        self.apply_fetch(&locator, outcome, renderer)
    }

    /// Rendered article body; empty until a fetch has rendered
    pub fn body_html(&self) -> &str {
        match &self.state {
            ViewState::Rendered(article) => &article.html,
            _ => "",
        }
    }

    /// Failure message, if the last fetch failed
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            ViewState::Failed { message } => Some(message),
            _ => None,
        }
    }
}
