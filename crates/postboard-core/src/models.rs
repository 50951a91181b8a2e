//! Core data models for Postboard.
//!
//! A post is the only persisted entity. [`NewPost`] is what a client
//! submits, [`PostRecord`] is what the store holds (including the embedding
//! vector), and [`PostView`] is what every read operation hands back.

use serde::{Deserialize, Serialize};

use crate::error::PostError;

/// A post as submitted by the add-post form or `POST /api/posts`.
///
/// `tags` has no serde default: a request without the field is rejected
/// during deserialization, while an explicit empty list is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub user_id: String,
}

impl NewPost {
    /// Reject posts with a blank title, description, or user id.
    ///
    /// A field consisting only of whitespace counts as missing.
    pub fn validate(&self) -> Result<(), PostError> {
        if self.title.trim().is_empty() {
            return Err(PostError::MissingField("title"));
        }
        if self.description.trim().is_empty() {
            return Err(PostError::MissingField("description"));
        }
        if self.user_id.trim().is_empty() {
            return Err(PostError::MissingField("user_id"));
        }
        Ok(())
    }

    /// The text this post's embedding is derived from.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.description, &self.tags)
    }
}

/// A stored post, including its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub user_id: String,
    pub embedding: Vec<f32>,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

/// A post as returned to clients. Never carries the raw vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub user_id: String,
    /// ISO 8601 creation time.
    pub created_at: String,
}

impl From<&PostRecord> for PostView {
    fn from(rec: &PostRecord) -> Self {
        Self {
            id: rec.id.clone(),
            title: rec.title.clone(),
            description: rec.description.clone(),
            tags: rec.tags.clone(),
            user_id: rec.user_id.clone(),
            created_at: format_ts_iso(rec.created_at),
        }
    }
}

impl From<PostRecord> for PostView {
    fn from(rec: PostRecord) -> Self {
        Self {
            created_at: format_ts_iso(rec.created_at),
            id: rec.id,
            title: rec.title,
            description: rec.description,
            tags: rec.tags,
            user_id: rec.user_id,
        }
    }
}

/// Assemble the text a post's embedding is computed from.
///
/// Title, description, and tags are joined with single spaces, in that
/// order. The same function is used for stored posts and for ad-hoc
/// similarity queries so both land in the same vector space.
///
/// ```rust
/// use postboard_core::models::embedding_text;
///
/// let tags = vec!["bike".to_string(), "repair".to_string()];
/// assert_eq!(
///     embedding_text("Fixie", "Needs new chain", &tags),
///     "Fixie Needs new chain bike repair"
/// );
/// ```
pub fn embedding_text(title: &str, description: &str, tags: &[String]) -> String {
    format!("{} {} {}", title, description, tags.join(" "))
}

/// Parse the comma-separated tag field of the add-post form.
///
/// Each entry is trimmed and empty entries are dropped, so `"a, ,b,"`
/// yields `["a", "b"]` and an empty input yields no tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
