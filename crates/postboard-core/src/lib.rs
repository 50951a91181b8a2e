//! # Postboard Core
//!
//! Shared logic for Postboard: post models and validation, the store
//! abstraction, the embedding trait, and the post operations (create,
//! fetch, list, search, similar).
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Backends and providers are supplied by the application through the
//! [`store::PostStore`] and [`embedding::Embedder`] traits.

pub mod embedding;
pub mod error;
pub mod models;
pub mod posts;
pub mod store;

pub use error::PostError;
