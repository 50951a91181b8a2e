//! SQLite-backed [`PostStore`] implementation.
//!
//! Posts live in a single `posts` table (see [`crate::migrate`]). Tags are
//! stored as a JSON array, embeddings as little-endian `f32` BLOBs. Vector
//! search scans the rows matching the equality filters and ranks them by
//! cosine similarity in process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use postboard_core::embedding::{blob_to_vec, cosine_similarity, text_hash, vec_to_blob};
use postboard_core::models::{embedding_text, PostRecord};
use postboard_core::store::{rank_matches, PostStore, VectorFilter, VectorMatch};

/// SQLite implementation of the [`PostStore`] trait.
pub struct SqlitePostStore {
    pool: SqlitePool,
    /// Recorded with each inserted vector.
    model: String,
}

impl SqlitePostStore {
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }
}

const POST_COLUMNS: &str = "id, title, description, user_id, tags_json, embedding, created_at";

fn row_to_record(row: &SqliteRow) -> Result<PostRecord> {
    let tags_json: String = row.get("tags_json");
    let tags: Vec<String> =
        serde_json::from_str(&tags_json).context("posts.tags_json is not a JSON string array")?;
    let blob: Vec<u8> = row.get("embedding");

    Ok(PostRecord {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        user_id: row.get("user_id"),
        tags,
        embedding: blob_to_vec(&blob),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn insert_post(&self, post: &PostRecord) -> Result<String> {
        let tags_json = serde_json::to_string(&post.tags)?;
        let hash = text_hash(&embedding_text(&post.title, &post.description, &post.tags));

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, description, user_id, tags_json,
                               embedding, embedding_model, embedding_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.user_id)
        .bind(&tags_json)
        .bind(vec_to_blob(&post.embedding))
        .bind(&self.model)
        .bind(&hash)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(post.id.clone())
    }

    async fn get_post(&self, id: &str) -> Result<Option<PostRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at ASC, rowid ASC",
            POST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn count_posts(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorMatch>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR title = ?2)
              AND (?3 IS NULL OR description = ?3)
            "#,
            POST_COLUMNS
        ))
        .bind(filter.user_id.as_deref())
        .bind(filter.title.as_deref())
        .bind(filter.description.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let post = row_to_record(row)?;
            // Tag membership lives in JSON; the other fields were filtered in SQL.
            if !filter.matches(&post) {
                continue;
            }
            candidates.push(VectorMatch {
                score: cosine_similarity(query_vec, &post.embedding) as f64,
                id: post.id,
            });
        }

        Ok(rank_matches(candidates, limit))
    }
}
