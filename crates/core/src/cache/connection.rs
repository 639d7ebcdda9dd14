//! Database connection management with pragma configuration.
//!
//! This module handles opening (or creating) the SQLite store, applying
//! pragmas for concurrent access, and creating the schema.

use super::migrations;
use crate::Error;
use crate::config::IN_MEMORY;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;

/// `busy_timeout` goes first so the journal-mode switch already waits on
/// other openers instead of failing.
const FILE_PRAGMAS: &str = "PRAGMA busy_timeout=5000;
     PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

const MEMORY_PRAGMAS: &str = "PRAGMA temp_store=MEMORY;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Each handle owns its own connection, which
/// closes when the handle is dropped.
#[derive(Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    location: PathBuf,
}

impl CacheDb {
    /// Open the store at `location`, creating it if needed.
    ///
    /// `:memory:` opens an ephemeral store. For a file path, missing parent
    /// directories are created first. The schema is created before the
    /// handle is returned.
    ///
    /// # Errors
    ///
    /// - `Error::StoreUnavailable` if the directory or file cannot be created or opened
    /// - `Error::Schema` if schema creation fails
    pub async fn open(location: impl AsRef<Path>) -> Result<Self, Error> {
        let location = location.as_ref();
        if location == Path::new(IN_MEMORY) {
            return Self::open_in_memory().await;
        }

        if !location.is_file() {
            if let Some(dir) = location.parent().filter(|d| !d.as_os_str().is_empty()) {
                create_dir(dir)?;
            }
            tracing::info!(path = %location.display(), "creating cache store");
        }

        let conn = Connection::open(location)
            .await
            .map_err(|e| Error::store_unavailable(location, e))?;

        conn.call(|conn| conn.execute_batch(FILE_PRAGMAS))
            .await
            .map_err(|e| Error::store_unavailable(location, e))?;

        migrations::run(&conn).await?;

        Ok(Self { conn, location: location.to_path_buf() })
    }

    /// Open an ephemeral in-memory store.
    ///
    /// The store is always new, so the schema is always created. Its
    /// contents vanish when the handle is dropped.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::store_unavailable(IN_MEMORY, e))?;

        conn.call(|conn| conn.execute_batch(MEMORY_PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, location: PathBuf::from(IN_MEMORY) })
    }

    /// Location this handle was opened from (`:memory:` for ephemeral stores).
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether this handle points at an ephemeral store.
    pub fn is_in_memory(&self) -> bool {
        self.location == Path::new(IN_MEMORY)
    }
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> Result<(), Error> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(dir)
        .map_err(|e| Error::store_unavailable(dir, e))
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir).map_err(|e| Error::store_unavailable(dir, e))
}
