//! SQLite-backed cache of raw weather responses, keyed by request URL.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use outage_core::{DatabaseError, RusqliteErrorExt};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// Response cache. Last writer wins.
pub struct HttpCache {
    conn: Mutex<Connection>,
}

impl HttpCache {
    /// Open (or create) a cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_database_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory cache.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_database_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            );
            "#,
        )
        .map_err(RusqliteErrorExt::into_database_error)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Look up a response. With `max_age`, entries older than that are
    /// treated as missing.
    pub fn get(&self, key: &str, max_age: Option<Duration>) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT body, cached_at FROM responses WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(RusqliteErrorExt::into_database_error)?;

        let Some((body, cached_at)) = row else {
            return Ok(None);
        };

        if let Some(max_age) = max_age {
            let age_ms = Utc::now().timestamp_millis().saturating_sub(cached_at);
            if age_ms < 0 || age_ms as u128 >= max_age.as_millis() {
                tracing::debug!("Cached response expired ({} ms old)", age_ms);
                return Ok(None);
            }
        }

        Ok(Some(body))
    }

    pub fn put(&self, key: &str, body: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO responses (key, body, cached_at) VALUES (?1, ?2, ?3)",
                params![key, body, now],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .lock()
            .execute("DELETE FROM responses WHERE key = ?1", params![key])
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<(), DatabaseError> {
        self.conn
            .lock()
            .execute_batch("DELETE FROM responses;")
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(())
    }

    #[cfg(test)]
    fn backdate(&self, key: &str, by: Duration) {
        let conn = self.conn.lock();
        let _ = conn.execute(
            "UPDATE responses SET cached_at = cached_at - ?1 WHERE key = ?2",
            params![by.as_millis() as i64, key],
        );
    }
}
