//! Storage abstraction for Postboard.
//!
//! The [`PostStore`] trait defines every storage operation the post
//! operations need, enabling pluggable backends (SQLite, in-memory, or a
//! hosted backend with its own vector index).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::PostRecord;

/// A nearest-neighbor hit returned by [`PostStore::vector_search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    /// Post UUID.
    pub id: String,
    /// Cosine similarity to the query vector.
    pub score: f64,
}

/// Equality filters applied to a vector search.
///
/// The filterable fields are `user_id`, `title`, `description`, and tag
/// membership. Unset fields do not constrain the search; the default
/// filter matches every post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorFilter {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
}

impl VectorFilter {
    /// Filter restricted to posts owned by `user_id`.
    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Whether `post` satisfies every set field of this filter.
    pub fn matches(&self, post: &PostRecord) -> bool {
        fn eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref().is_none_or(|w| w == have)
        }
        eq(&self.user_id, &post.user_id)
            && eq(&self.title, &post.title)
            && eq(&self.description, &post.description)
            && self
                .tag
                .as_deref()
                .is_none_or(|t| post.tags.iter().any(|pt| pt == t))
    }
}

/// Abstract storage backend for posts.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_post`](PostStore::insert_post) | Persist a new post |
/// | [`get_post`](PostStore::get_post) | Fetch one post by ID |
/// | [`get_posts`](PostStore::get_posts) | Fetch several posts by ID, in the given order |
/// | [`list_posts`](PostStore::list_posts) | All posts, oldest first |
/// | [`count_posts`](PostStore::count_posts) | Number of stored posts |
/// | [`vector_search`](PostStore::vector_search) | Filtered nearest-neighbor search |
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a new post. Returns its ID.
    async fn insert_post(&self, post: &PostRecord) -> Result<String>;

    /// Retrieve a post by ID. Unknown IDs yield `Ok(None)`.
    async fn get_post(&self, id: &str) -> Result<Option<PostRecord>>;

    /// Retrieve posts by ID, preserving the order of `ids` and skipping
    /// IDs that do not exist.
    async fn get_posts(&self, ids: &[String]) -> Result<Vec<PostRecord>> {
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.get_post(id).await? {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    /// All posts ordered by creation time, oldest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>>;

    async fn count_posts(&self) -> Result<usize>;

    /// Cosine-similarity search over stored embeddings.
    ///
    /// Returns at most `limit` matches satisfying `filter`, best first.
    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>>;
}

/// Sort matches best-first and keep the top `limit`.
pub fn rank_matches(mut matches: Vec<VectorMatch>, limit: usize) -> Vec<VectorMatch> {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(limit);
    matches
}
