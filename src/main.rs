//! # Postboard CLI (`postboard`)
//!
//! Creates the database, adds and reads posts, runs semantic search and
//! similar-post lookups, and starts the JSON HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! postboard --config ./config/postboard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `postboard init` | Create the SQLite database and run schema migrations |
//! | `postboard add ...` | Create a post (embeds title, description, tags) |
//! | `postboard get <id>` | Show a post and its similar posts by the same user |
//! | `postboard list [--query q]` | All posts, or search results for `q` |
//! | `postboard search "<query>"` | Semantic search over all posts |
//! | `postboard similar <id>` | Similar posts by the same user |
//! | `postboard serve` | Start the HTTP server |
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info,postboard=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postboard::{config, migrate, posts, server};

/// Postboard: post listings, search them semantically, and find similar posts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/postboard.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "postboard",
    about = "Post listings, search them semantically, and find similar posts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/postboard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it on an existing database is safe.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Create a post.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Comma-separated tags, e.g. `"bike,road"`.
        #[arg(long, default_value = "")]
        tags: String,

        #[arg(long)]
        user_id: String,
    },

    /// Show a post and its similar posts by the same user.
    Get {
        id: String,
    },

    /// List all posts, or the search results for `--query`.
    List {
        /// A blank query lists everything.
        #[arg(long)]
        query: Option<String>,
    },

    /// Semantic search over all posts.
    Search {
        query: String,
    },

    /// Similar posts by the same user, excluding the post itself.
    Similar {
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,postboard=debug")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Add {
            title,
            description,
            tags,
            user_id,
        } => {
            posts::run_add(&cfg, title, description, &tags, user_id).await?;
        }
        Commands::Get { id } => {
            posts::run_get(&cfg, &id).await?;
        }
        Commands::List { query } => {
            posts::run_list(&cfg, query.as_deref()).await?;
        }
        Commands::Search { query } => {
            posts::run_search(&cfg, &query).await?;
        }
        Commands::Similar { id } => {
            posts::run_similar(&cfg, &id).await?;
        }
    }

    Ok(())
}
