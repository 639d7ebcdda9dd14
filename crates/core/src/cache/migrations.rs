//! Database schema creation.
//!
//! The applied version is tracked in `PRAGMA user_version` so the persisted
//! schema stays a single `cache` table. Every statement uses
//! `IF NOT EXISTS`, so stores created by other tooling with the same layout
//! are adopted as-is.

use super::Error;
use tokio_rusqlite::rusqlite::TransactionBehavior;
use tokio_rusqlite::{Connection, rusqlite};

/// Migration list: (version, SQL).
///
/// Migrations must be applied in order. A migration runs when its version
/// is greater than the store's `user_version`.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_cache.sql")),
    (2, include_str!("../../migrations/002_cache_timeout.sql")),
];

/// Latest schema version known to this build.
pub const SCHEMA_VERSION: i64 = MIGRATIONS[MIGRATIONS.len() - 1].0;

/// Run any pending migrations.
///
/// # Errors
///
/// Returns `Error::Schema` carrying SQLite's diagnostic if a statement fails.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> { apply(conn) })
        .await
        .map_err(Error::from)
}

fn apply(conn: &mut rusqlite::Connection) -> Result<(), Error> {
    let current: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(schema_error)?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    for (version, sql) in MIGRATIONS {
        // Concurrent openers wait here on the busy handler; the version is
        // re-read under the write lock.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(schema_error)?;

        let current: i64 = tx
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(schema_error)?;
        if *version <= current {
            continue;
        }

        tx.execute_batch(sql).map_err(schema_error)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version}"))
            .map_err(schema_error)?;
        tx.commit().map_err(schema_error)?;

        tracing::info!(version, "applied cache schema migration");
    }

    Ok(())
}

fn schema_error(err: rusqlite::Error) -> Error {
    Error::Schema(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "cache").await);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let version: i64 = conn
            .call(|conn| conn.query_row("PRAGMA user_version", [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_single_table_schema() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let tables: i64 = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_unique_key_constraint() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let duplicate = conn
            .call(|conn| {
                conn.execute("INSERT INTO cache (key, data, timeout, last_modified) VALUES ('k', 'a', 1, 1)", [])?;
                conn.execute("INSERT INTO cache (key, data, timeout, last_modified) VALUES ('k', 'b', 1, 1)", [])
            })
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_missing_key_column_is_schema_error() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.execute_batch("CREATE TABLE cache (id INTEGER);"))
            .await
            .unwrap();

        let result = run(&conn).await;
        assert!(matches!(result, Err(Error::Schema(_))));

        let version: i64 = conn
            .call(|conn| conn.query_row("PRAGMA user_version", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(version, 0);
    }

    #[tokio::test]
    async fn test_adopts_existing_schema() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE [cache] ([key] VARCHAR(255), [data] LONGVARCHAR, [timeout] TIMESTAMP, [last_modified] TIMESTAMP);
                 CREATE UNIQUE INDEX [cache_unique] ON [cache] ([key]);
                 INSERT INTO cache (key, data, timeout, last_modified) VALUES ('legacy', 'v', 10, 1);",
            )
        })
        .await
        .unwrap();

        run(&conn).await.unwrap();

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
