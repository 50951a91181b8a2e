//! Post operations: the remote-callable surface of Postboard.
//!
//! Every frontend (HTTP server, CLI) delegates to the functions in this
//! module. They operate entirely through the [`PostStore`] and [`Embedder`]
//! traits; the caller picks the concrete backends.
//!
//! | Operation | Embeds? | Vector search |
//! |-----------|---------|---------------|
//! | [`create_post`] | title + description + tags | no |
//! | [`get_post`] / [`list_posts`] | no | no |
//! | [`search_posts`] | query text | unfiltered, `search_limit` |
//! | [`similar_posts_by_id`] | no (reuses stored vector) | same user, `similar_limit + 1` |
//! | [`similar_posts`] | ad-hoc content | same user, `similar_limit` |
//! | [`listing`] | query text, if any | as [`search_posts`] |

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::error::PostError;
use crate::models::{embedding_text, NewPost, PostRecord, PostView};
use crate::store::{PostStore, VectorFilter, VectorMatch};

/// Result-count limits for the search operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostLimits {
    /// Maximum results for a free-text search.
    pub search_limit: usize,
    /// Maximum results for a "similar posts" lookup.
    pub similar_limit: usize,
}

impl Default for PostLimits {
    fn default() -> Self {
        Self {
            search_limit: 10,
            similar_limit: 5,
        }
    }
}

/// Ad-hoc content to find similar posts for, scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarQuery {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub user_id: String,
}

/// What the listing page shows.
///
/// `All` is the state before any search and after the search box is
/// cleared. `Search` is the state after a non-blank query, including when
/// it found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Listing {
    All { posts: Vec<PostView> },
    Search { query: String, posts: Vec<PostView> },
}

impl Listing {
    pub fn posts(&self) -> &[PostView] {
        match self {
            Listing::All { posts } | Listing::Search { posts, .. } => posts,
        }
    }
}

/// What the detail page shows: the post and its recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub similar: Vec<PostView>,
}

/// Validate, embed, and store a new post. Returns the new post's ID.
///
/// Nothing is written unless validation passes and the provider returns a
/// vector of the expected dimensionality.
pub async fn create_post<S, E>(store: &S, embedder: &E, post: NewPost) -> Result<String>
where
    S: PostStore + ?Sized,
    E: Embedder + ?Sized,
{
    post.validate()?;

    let embedding = embed_checked(embedder, &post.embedding_text()).await?;

    let record = PostRecord {
        id: Uuid::new_v4().to_string(),
        title: post.title,
        description: post.description,
        tags: post.tags,
        user_id: post.user_id,
        embedding,
        created_at: chrono::Utc::now().timestamp(),
    };

    store.insert_post(&record).await
}

/// Fetch one post. Unknown IDs yield `None`.
pub async fn get_post<S>(store: &S, id: &str) -> Result<Option<PostView>>
where
    S: PostStore + ?Sized,
{
    Ok(store.get_post(id).await?.map(PostView::from))
}

/// All posts, oldest first.
pub async fn list_posts<S>(store: &S) -> Result<Vec<PostView>>
where
    S: PostStore + ?Sized,
{
    Ok(store
        .list_posts()
        .await?
        .into_iter()
        .map(PostView::from)
        .collect())
}

/// Semantic search over all posts.
///
/// A blank query returns no results without calling the embedder.
pub async fn search_posts<S, E>(
    store: &S,
    embedder: &E,
    query: &str,
    limits: PostLimits,
) -> Result<Vec<PostView>>
where
    S: PostStore + ?Sized,
    E: Embedder + ?Sized,
{
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embed_checked(embedder, query).await?;
    let matches = store
        .vector_search(&query_vec, limits.search_limit, &VectorFilter::default())
        .await?;
    debug!(query, hits = matches.len(), "search_posts");

    fetch_ranked(store, &matches).await
}

/// Posts by the same user that are closest to the post `id`.
///
/// Uses the stored embedding of the source post. The source post itself is
/// never part of the result, which holds at most `similar_limit` posts.
/// Unknown IDs yield an empty list.
pub async fn similar_posts_by_id<S>(
    store: &S,
    id: &str,
    limits: PostLimits,
) -> Result<Vec<PostView>>
where
    S: PostStore + ?Sized,
{
    let source = match store.get_post(id).await? {
        Some(p) => p,
        None => return Ok(Vec::new()),
    };

    // One extra slot: the source post is its own nearest neighbor.
    let matches = store
        .vector_search(
            &source.embedding,
            limits.similar_limit + 1,
            &VectorFilter::by_user(source.user_id.clone()),
        )
        .await?;

    let matches: Vec<VectorMatch> = matches
        .into_iter()
        .filter(|m| m.id != source.id)
        .take(limits.similar_limit)
        .collect();
    debug!(id, hits = matches.len(), "similar_posts_by_id");

    fetch_ranked(store, &matches).await
}

/// Posts by `query.user_id` closest to ad-hoc content.
pub async fn similar_posts<S, E>(
    store: &S,
    embedder: &E,
    query: SimilarQuery,
    limits: PostLimits,
) -> Result<Vec<PostView>>
where
    S: PostStore + ?Sized,
    E: Embedder + ?Sized,
{
    if query.user_id.trim().is_empty() {
        return Err(PostError::MissingField("user_id").into());
    }

    let text = embedding_text(
        &query.title,
        query.description.as_deref().unwrap_or_default(),
        &query.tags,
    );
    let query_vec = embed_checked(embedder, &text).await?;
    let matches = store
        .vector_search(
            &query_vec,
            limits.similar_limit,
            &VectorFilter::by_user(query.user_id),
        )
        .await?;

    fetch_ranked(store, &matches).await
}

/// Build the listing page for an optional search box value.
pub async fn listing<S, E>(
    store: &S,
    embedder: &E,
    query: Option<&str>,
    limits: PostLimits,
) -> Result<Listing>
where
    S: PostStore + ?Sized,
    E: Embedder + ?Sized,
{
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        None => Ok(Listing::All {
            posts: list_posts(store).await?,
        }),
        Some(q) => Ok(Listing::Search {
            query: q.to_string(),
            posts: search_posts(store, embedder, q, limits).await?,
        }),
    }
}

/// Build the detail page for a post. Unknown IDs yield `None`.
pub async fn post_detail<S>(store: &S, id: &str, limits: PostLimits) -> Result<Option<PostDetail>>
where
    S: PostStore + ?Sized,
{
    let post = match get_post(store, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    let similar = similar_posts_by_id(store, id, limits).await?;
    Ok(Some(PostDetail { post, similar }))
}

/// Embed `text`, rejecting vectors whose length differs from `embedder.dims()`.
async fn embed_checked<E>(embedder: &E, text: &str) -> Result<Vec<f32>>
where
    E: Embedder + ?Sized,
{
    let vec = embedder.embed(text).await?;
    if vec.len() != embedder.dims() {
        return Err(PostError::InvalidDimension {
            expected: embedder.dims(),
            actual: vec.len(),
        }
        .into());
    }
    Ok(vec)
}

async fn fetch_ranked<S>(store: &S, matches: &[VectorMatch]) -> Result<Vec<PostView>>
where
    S: PostStore + ?Sized,
{
    let ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
    Ok(store
        .get_posts(&ids)
        .await?
        .into_iter()
        .map(PostView::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::store::memory::InMemoryPostStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps [`HashEmbedder`] and counts calls.
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(256),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
    }

    /// Returns vectors one element short.
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
    }

    fn new_post(title: &str, description: &str, tags: &[&str], user: &str) -> NewPost {
        NewPost {
            title: title.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            user_id: user.into(),
        }
    }

    #[tokio::test]
    async fn test_create_stores_embedding_of_combined_text() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        let post = new_post("Kayak", "Two-seat touring kayak", &["water", "boat"], "u1");
        let expected = embedder.inner.embed_sync(&post.embedding_text());

        let id = create_post(&store, &embedder, post).await.unwrap();

        let stored = store.get_post(&id).await.unwrap().unwrap();
        assert_eq!(stored.embedding, expected);
        assert_eq!(stored.tags, vec!["water", "boat"]);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_missing_field_leaves_store_untouched() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();

        for post in [
            new_post("", "d", &[], "u"),
            new_post("t", "", &[], "u"),
            new_post("t", "d", &[], ""),
        ] {
            let err = create_post(&store, &embedder, post).await.unwrap_err();
            assert!(err.downcast_ref::<PostError>().unwrap().is_validation());
        }

        assert_eq!(store.count_posts().await.unwrap(), 0);
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_dimension() {
        let store = InMemoryPostStore::new();
        let err = create_post(&store, &ShortEmbedder, new_post("t", "d", &[], "u"))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PostError>(),
            Some(&PostError::InvalidDimension {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(store.count_posts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_post_is_none() {
        let store = InMemoryPostStore::new();
        assert!(get_post(&store, "nope").await.unwrap().is_none());
        assert!(post_detail(&store, "nope", PostLimits::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_blank_search_skips_embedder() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        create_post(&store, &embedder, new_post("a", "b", &[], "u"))
            .await
            .unwrap();

        let results = search_posts(&store, &embedder, "   ", PostLimits::default())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity_across_users() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        create_post(&store, &embedder, new_post("Piano", "Lessons weekly", &["music"], "u1"))
            .await
            .unwrap();
        create_post(&store, &embedder, new_post("Guitar", "Acoustic guitar", &["music"], "u2"))
            .await
            .unwrap();

        let results = search_posts(&store, &embedder, "acoustic guitar", PostLimits::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Guitar");
    }

    #[tokio::test]
    async fn test_search_rejects_wrong_dimension_query() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        create_post(&store, &embedder, new_post("Guitar", "Acoustic guitar", &[], "u1"))
            .await
            .unwrap();

        let err = search_posts(&store, &ShortEmbedder, "acoustic guitar", PostLimits::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PostError>(),
            Some(&PostError::InvalidDimension {
                expected: 4,
                actual: 3
            })
        );

        let query = SimilarQuery {
            title: "Guitar".into(),
            description: None,
            tags: vec![],
            user_id: "u1".into(),
        };
        let err = similar_posts(&store, &ShortEmbedder, query, PostLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PostError>(),
            Some(PostError::InvalidDimension { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        for i in 0..4 {
            create_post(&store, &embedder, new_post(&format!("post {}", i), "d", &[], "u"))
                .await
                .unwrap();
        }
        let limits = PostLimits {
            search_limit: 3,
            ..PostLimits::default()
        };
        let results = search_posts(&store, &embedder, "post", limits).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_similar_by_id_excludes_source_and_other_users() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        let source = create_post(&store, &embedder, new_post("bike", "red bike", &["bike"], "u1"))
            .await
            .unwrap();
        for i in 0..7 {
            create_post(
                &store,
                &embedder,
                new_post(&format!("bike {}", i), "bike", &["bike"], "u1"),
            )
            .await
            .unwrap();
        }
        create_post(&store, &embedder, new_post("bike", "red bike", &["bike"], "u2"))
            .await
            .unwrap();

        let calls_before = embedder.calls();
        let similar = similar_posts_by_id(&store, &source, PostLimits::default())
            .await
            .unwrap();

        assert_eq!(similar.len(), 5);
        assert!(similar.iter().all(|p| p.id != source));
        assert!(similar.iter().all(|p| p.user_id == "u1"));
        assert_eq!(embedder.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_similar_by_id_unknown_is_empty() {
        let store = InMemoryPostStore::new();
        let similar = similar_posts_by_id(&store, "missing", PostLimits::default())
            .await
            .unwrap();
        assert!(similar.is_empty());
    }

    #[tokio::test]
    async fn test_similar_by_id_single_post_is_empty() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        let id = create_post(&store, &embedder, new_post("only", "one", &[], "u"))
            .await
            .unwrap();
        let similar = similar_posts_by_id(&store, &id, PostLimits::default())
            .await
            .unwrap();
        assert!(similar.is_empty());
    }

    #[tokio::test]
    async fn test_similar_by_content_scoped_to_user() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        create_post(&store, &embedder, new_post("tent", "camping tent", &["outdoor"], "u1"))
            .await
            .unwrap();
        create_post(&store, &embedder, new_post("tent", "camping tent", &["outdoor"], "u2"))
            .await
            .unwrap();

        let query = SimilarQuery {
            title: "tent".into(),
            description: None,
            tags: vec!["outdoor".into()],
            user_id: "u2".into(),
        };
        let similar = similar_posts(&store, &embedder, query, PostLimits::default())
            .await
            .unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].user_id, "u2");
    }

    #[tokio::test]
    async fn test_similar_by_content_requires_user() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        let query = SimilarQuery {
            title: "tent".into(),
            description: None,
            tags: vec![],
            user_id: " ".into(),
        };
        assert!(similar_posts(&store, &embedder, query, PostLimits::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_listing_distinguishes_all_from_empty_search() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        create_post(&store, &embedder, new_post("lamp", "desk lamp", &[], "u"))
            .await
            .unwrap();

        let all = listing(&store, &embedder, None, PostLimits::default())
            .await
            .unwrap();
        assert!(matches!(all, Listing::All { .. }));
        assert_eq!(all.posts().len(), 1);

        let cleared = listing(&store, &embedder, Some("  "), PostLimits::default())
            .await
            .unwrap();
        assert!(matches!(cleared, Listing::All { .. }));

        let empty_store = InMemoryPostStore::new();
        let search = listing(&empty_store, &embedder, Some("lamp"), PostLimits::default())
            .await
            .unwrap();
        assert_eq!(
            search,
            Listing::Search {
                query: "lamp".into(),
                posts: vec![]
            }
        );
    }

    #[tokio::test]
    async fn test_listing_serializes_mode_tag() {
        let listing = Listing::Search {
            query: "q".into(),
            posts: vec![],
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["mode"], "search");
        assert_eq!(json["query"], "q");
    }

    #[tokio::test]
    async fn test_post_detail_bundles_similar() {
        let store = InMemoryPostStore::new();
        let embedder = CountingEmbedder::new();
        let id = create_post(&store, &embedder, new_post("chair", "oak chair", &[], "u"))
            .await
            .unwrap();
        create_post(&store, &embedder, new_post("chair", "pine chair", &[], "u"))
            .await
            .unwrap();

        let detail = post_detail(&store, &id, PostLimits::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.post.id, id);
        assert_eq!(detail.similar.len(), 1);
    }
}
