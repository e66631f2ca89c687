//! Data models for collected links, snapshot lookups and result rows.
//!
//! - [`ArticleLink`]: an absolute article URL discovered on the index page
//! - [`SnapshotResult`]: the outcome of mining one link from the archive
//! - [`ExtractedArticle`]: title and body pulled out of a snapshot DOM
//! - [`PipelineRow`]: a row handed to the publishing and storage collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// An absolute article URL resolved against the index site's origin.
///
/// Equality is exact string equality of the serialized URL, which is what
/// the collected set is deduplicated by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleLink(Url);

impl ArticleLink {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ArticleLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// How a snapshot lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// A snapshot was located and its content extracted.
    Found,
    /// The provider confirmed it holds no snapshot within the time budget.
    NotFound,
    /// Every retry attempt failed with a transient fault.
    Failed,
}

/// Outcome of mining a single article link.
///
/// `title` and `body` are empty unless `status` is [`SnapshotStatus::Found`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResult {
    pub title: String,
    pub body: String,
    pub snapshot_url: String,
    pub status: SnapshotStatus,
}

impl SnapshotResult {
    pub fn found(article: ExtractedArticle, snapshot_url: String) -> Self {
        Self {
            title: article.title,
            body: article.body,
            snapshot_url,
            status: SnapshotStatus::Found,
        }
    }

    pub fn not_found() -> Self {
        Self::empty(SnapshotStatus::NotFound)
    }

    pub fn failed() -> Self {
        Self::empty(SnapshotStatus::Failed)
    }

    fn empty(status: SnapshotStatus) -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            snapshot_url: String::new(),
            status,
        }
    }

    /// True when the lookup succeeded and produced usable text.
    pub fn has_content(&self) -> bool {
        self.status == SnapshotStatus::Found
            && !self.title.trim().is_empty()
            && !self.body.trim().is_empty()
    }
}

/// Title and body extracted from a snapshot DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub body: String,
}

/// A single `{ title, body }` row accumulated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRow {
    pub title: String,
    pub body: String,
}
