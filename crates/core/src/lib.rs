//! Core of stash, a persistent key-value cache with expiration.
//!
//! This crate provides:
//! - A SQLite-backed cache engine (schema, TTL model, sweeping, pattern invalidation)
//! - The `CacheStore` contract with SQLite and in-process backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

pub use cache::{CacheDb, CacheEntry, KeyPattern};
pub use config::{CacheConfig, ConfigError};
pub use error::Error;
pub use store::{CacheStore, CleanMode, MemoryCache, SqliteCache, open_store};
