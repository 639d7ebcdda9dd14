//! Cache row operations.
//!
//! Every read filters on `timeout > now` inside the query itself, so expired
//! rows are never returned even while they still physically exist.
//! Deletions by key, by predicate, or in bulk ignore liveness.

use std::collections::HashMap;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::rusqlite::TransactionBehavior;
use tokio_rusqlite::rusqlite::types::Value;

/// Maximum keys bound into a single `IN (...)` lookup.
const MANY_CHUNK: usize = 500;

/// A cache row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub data: String,
    /// Absolute expiry, epoch seconds.
    pub timeout: i64,
    /// Last write, epoch seconds.
    pub last_modified: i64,
}

/// Timestamp columns readable through [`CacheDb::select_live_column`].
#[derive(Debug, Clone, Copy)]
enum Stamp {
    Timeout,
    LastModified,
}

impl Stamp {
    fn query(self) -> &'static str {
        match self {
            Stamp::Timeout => "SELECT timeout FROM cache WHERE key = ?1 AND timeout > ?2",
            Stamp::LastModified => "SELECT last_modified FROM cache WHERE key = ?1 AND timeout > ?2",
        }
    }
}

impl CacheDb {
    /// Insert or replace the row for `key` in one statement.
    pub async fn upsert(&self, key: &str, data: &str, timeout: i64, last_modified: i64) -> Result<(), Error> {
        let key = key.to_string();
        let data = data.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO cache (key, data, timeout, last_modified) VALUES (?1, ?2, ?3, ?4)",
                    params![key, data, timeout, last_modified],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the row for `key` if it is live at `now`.
    ///
    /// Returns None if the key doesn't exist or has expired.
    pub async fn select_live(&self, key: &str, now: i64) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, data, timeout, last_modified FROM cache WHERE key = ?1 AND timeout > ?2",
                )?;

                let result = stmt.query_row(params![key, now], |row| {
                    Ok(CacheEntry { key: row.get(0)?, data: row.get(1)?, timeout: row.get(2)?, last_modified: row.get(3)? })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Check if a live row exists for `key`.
    pub async fn exists_live(&self, key: &str, now: i64) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let live: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache WHERE key = ?1 AND timeout > ?2)",
                    params![key, now],
                    |row| row.get(0),
                )?;
                Ok(live)
            })
            .await
            .map_err(Error::from)
    }

    /// Map each requested key with a live row to its data.
    ///
    /// Keys without a live row are absent from the result. One placeholder
    /// is bound per key.
    pub async fn select_live_many(&self, keys: &[String], now: i64) -> Result<HashMap<String, String>, Error> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let keys = keys.to_vec();
        self.conn
            .call(move |conn| -> Result<HashMap<String, String>, Error> {
                let mut found = HashMap::with_capacity(keys.len());

                for chunk in keys.chunks(MANY_CHUNK) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!("SELECT key, data FROM cache WHERE key IN ({placeholders}) AND timeout > ?");

                    let mut values: Vec<Value> = chunk.iter().cloned().map(Value::Text).collect();
                    values.push(Value::Integer(now));

                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(values), |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?;

                    for row in rows {
                        let (key, data) = row?;
                        found.insert(key, data);
                    }
                }

                Ok(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Expiry timestamp of the live row for `key`, or 0.
    pub async fn select_timeout(&self, key: &str, now: i64) -> Result<i64, Error> {
        self.select_live_column(key, now, Stamp::Timeout).await
    }

    /// Last-modified timestamp of the live row for `key`, or 0.
    pub async fn select_last_modified(&self, key: &str, now: i64) -> Result<i64, Error> {
        self.select_live_column(key, now, Stamp::LastModified).await
    }

    async fn select_live_column(&self, key: &str, now: i64, stamp: Stamp) -> Result<i64, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let result = conn.query_row(stamp.query(), params![key, now], |row| row.get::<_, i64>(0));

                match result {
                    Ok(value) => Ok(value),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the row for `key`, live or not.
    ///
    /// Returns the number of deleted rows (0 or 1).
    pub async fn delete_by_key(&self, key: &str) -> Result<u64, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every row whose key satisfies `predicate`, live or not.
    ///
    /// Keys are scanned and deleted inside one write transaction, taken
    /// before the scan so other writers are waited on rather than raced.
    /// Returns the number of deleted rows.
    pub async fn delete_by_predicate<P>(&self, predicate: P) -> Result<u64, Error>
    where
        P: Fn(&str) -> bool + Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let matched = {
                    let mut stmt = tx.prepare("SELECT key FROM cache")?;
                    let keys = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

                    let mut matched = Vec::new();
                    for key in keys {
                        if let Some(key) = key? {
                            if predicate(&key) {
                                matched.push(key);
                            }
                        }
                    }
                    matched
                };

                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM cache WHERE key = ?1")?;
                    for key in &matched {
                        deleted += stmt.execute(params![key])? as u64;
                    }
                }

                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete rows in bulk.
    ///
    /// With `only_expired`, removes rows with `timeout < now`; otherwise
    /// removes every row. Returns the number of deleted rows.
    pub async fn delete_all(&self, only_expired: bool, now: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = if only_expired {
                    conn.execute("DELETE FROM cache WHERE timeout < ?1", params![now])?
                } else {
                    conn.execute("DELETE FROM cache", [])?
                };
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows physically present, expired ones included.
    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
