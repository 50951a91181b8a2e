//! Post commands for the `postboard` CLI.
//!
//! Each `run_*` function opens the configured backends, calls the matching
//! operation in [`postboard_core::posts`], and prints the result to stdout.
//! The HTTP server shares [`Backends`] but renders JSON instead.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use postboard_core::embedding::Embedder;
use postboard_core::models::{parse_tags, NewPost, PostView};
use postboard_core::posts::{self, Listing, PostDetail, PostLimits, SimilarQuery};
use postboard_core::store::PostStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::migrate;
use crate::sqlite_store::SqlitePostStore;

/// The store, embedder, and limits every operation needs.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn PostStore>,
    pub embedder: Arc<dyn Embedder>,
    pub limits: PostLimits,
}

impl Backends {
    /// Open the SQLite store (applying migrations) and the configured embedder.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        let embedder = create_embedder(&config.embedding)?;
        let store = SqlitePostStore::new(pool, embedder.model_name());
        Ok(Self {
            store: Arc::new(store),
            embedder,
            limits: config.retrieval.limits(),
        })
    }

    pub async fn create_post(&self, post: NewPost) -> Result<String> {
        let user_id = post.user_id.clone();
        let id = posts::create_post(self.store.as_ref(), self.embedder.as_ref(), post).await?;
        info!(%id, %user_id, "post created");
        Ok(id)
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<PostView>> {
        posts::get_post(self.store.as_ref(), id).await
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>> {
        posts::list_posts(self.store.as_ref()).await
    }

    pub async fn search_posts(&self, query: &str) -> Result<Vec<PostView>> {
        posts::search_posts(
            self.store.as_ref(),
            self.embedder.as_ref(),
            query,
            self.limits,
        )
        .await
    }

    pub async fn similar_posts_by_id(&self, id: &str) -> Result<Vec<PostView>> {
        posts::similar_posts_by_id(self.store.as_ref(), id, self.limits).await
    }

    pub async fn similar_posts(&self, query: SimilarQuery) -> Result<Vec<PostView>> {
        posts::similar_posts(
            self.store.as_ref(),
            self.embedder.as_ref(),
            query,
            self.limits,
        )
        .await
    }

    pub async fn post_detail(&self, id: &str) -> Result<Option<PostDetail>> {
        posts::post_detail(self.store.as_ref(), id, self.limits).await
    }

    pub async fn listing(&self, query: Option<&str>) -> Result<Listing> {
        posts::listing(
            self.store.as_ref(),
            self.embedder.as_ref(),
            query,
            self.limits,
        )
        .await
    }
}

pub async fn run_add(
    config: &Config,
    title: String,
    description: String,
    tags: &str,
    user_id: String,
) -> Result<()> {
    let backends = Backends::open(config).await?;
    let id = backends
        .create_post(NewPost {
            title,
            description,
            tags: parse_tags(tags),
            user_id,
        })
        .await?;
    println!("Post added: {}", id);
    Ok(())
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let backends = Backends::open(config).await?;
    let detail = match backends.post_detail(id).await? {
        Some(d) => d,
        None => {
            println!("Post not found: {}", id);
            return Ok(());
        }
    };

    println!("--- Post ---");
    print_post(&detail.post);
    println!();

    println!("--- Similar Posts ({}) ---", detail.similar.len());
    print_posts(&detail.similar);

    Ok(())
}

pub async fn run_list(config: &Config, query: Option<&str>) -> Result<()> {
    let backends = Backends::open(config).await?;
    match backends.listing(query).await? {
        Listing::All { posts } => {
            if posts.is_empty() {
                println!("No posts yet.");
            }
            print_posts(&posts);
        }
        Listing::Search { query, posts } => {
            if posts.is_empty() {
                println!("No results for \"{}\".", query);
            }
            print_posts(&posts);
        }
    }
    Ok(())
}

pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    let backends = Backends::open(config).await?;
    let results = backends.search_posts(query).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    print_posts(&results);
    Ok(())
}

pub async fn run_similar(config: &Config, id: &str) -> Result<()> {
    let backends = Backends::open(config).await?;
    let similar = backends.similar_posts_by_id(id).await?;
    if similar.is_empty() {
        println!("No similar posts.");
        return Ok(());
    }
    print_posts(&similar);
    Ok(())
}

fn print_post(post: &PostView) {
    println!("id:          {}", post.id);
    println!("title:       {}", post.title);
    println!("description: {}", post.description);
    println!("tags:        {}", post.tags.join(", "));
    println!("posted by:   {}", post.user_id);
    println!("created_at:  {}", post.created_at);
}

fn print_posts(posts: &[PostView]) {
    for (i, post) in posts.iter().enumerate() {
        println!("{}. {}  [{}]", i + 1, post.title, post.id);
        println!("   {}", post.description);
        if !post.tags.is_empty() {
            println!("   tags: {}", post.tags.join(", "));
        }
        println!("   by {}", post.user_id);
    }
}
