//! SQLite-backed key-value cache with expiration.
//!
//! This module provides the storage side of the cache engine using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - A single `cache` table with a unique key, opaque data, and absolute
//!   expiry/modification timestamps (epoch seconds)
//! - Automatic schema creation on first open
//! - WAL mode for concurrent readers
//! - Glob-style bulk invalidation and probabilistic sweeping of expired rows

pub mod cleaning;
pub mod connection;
pub mod entries;
pub mod expiry;
pub mod migrations;
pub mod pattern;

pub use crate::Error;

pub use cleaning::{CleaningScheduler, Dice, LoadedDice, RngDice};
pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use expiry::ExpirationPolicy;
pub use pattern::KeyPattern;
