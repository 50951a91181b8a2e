//! In-memory [`PostStore`] implementation for tests and ephemeral servers.
//!
//! Posts live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Vector search is brute-force cosine similarity over all stored vectors.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::PostRecord;

use super::{rank_matches, PostStore, VectorFilter, VectorMatch};

/// In-memory post store.
pub struct InMemoryPostStore {
    posts: RwLock<Vec<PostRecord>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory post store lock poisoned")
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn insert_post(&self, post: &PostRecord) -> Result<String> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        if posts.iter().any(|p| p.id == post.id) {
            anyhow::bail!("post already exists: {}", post.id);
        }
        posts.push(post.clone());
        Ok(post.id.clone())
    }

    async fn get_post(&self, id: &str) -> Result<Option<PostRecord>> {
        let posts = self.posts.read().map_err(poisoned)?;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>> {
        let posts = self.posts.read().map_err(poisoned)?;
        let mut all = posts.clone();
        // Stable sort keeps insertion order for equal timestamps.
        all.sort_by_key(|p| p.created_at);
        Ok(all)
    }

    async fn count_posts(&self) -> Result<usize> {
        Ok(self.posts.read().map_err(poisoned)?.len())
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>> {
        let posts = self.posts.read().map_err(poisoned)?;
        let matches = posts
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| VectorMatch {
                id: p.id.clone(),
                score: cosine_similarity(query_vec, &p.embedding) as f64,
            })
            .collect();
        Ok(rank_matches(matches, limit))
    }
}
