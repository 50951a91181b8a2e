//! # Postboard
//!
//! Post short listings (title, description, tags), search them
//! semantically, and get "similar posts by the same user" recommendations.
//!
//! Every post is embedded once, at creation, from its title, description,
//! and tags. Search embeds the query text; similar-post lookups reuse the
//! stored vector. Ranking is an exhaustive cosine scan over SQLite rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────────┐
//! │   CLI    │──▶│  postboard-core  │──▶│    SQLite    │
//! │  (HTTP)  │   │ posts + traits   │   │ posts table  │
//! └──────────┘   └────────┬─────────┘   └──────────────┘
//!                         │
//!                         ▼
//!                 ┌──────────────┐
//!                 │   Embedder   │
//!                 │ Voyage/hash  │
//!                 └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! postboard init
//! postboard add --title "Road bike" --description "Barely used" --tags "bike,road" --user-id alice
//! postboard list --query "bicycle"
//! postboard serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite [`PostStore`](postboard_core::store::PostStore) |
//! | [`embedding`] | Embedding providers (Voyage, hash, disabled) |
//! | [`posts`] | Backends and CLI post commands |
//! | [`server`] | JSON HTTP API |

pub mod config;
pub mod db;
pub mod embedding;
pub mod migrate;
pub mod posts;
pub mod server;
pub mod sqlite_store;

pub use postboard_core;
