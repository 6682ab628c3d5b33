use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ShareRecord, ShareStore, StoreError};

/// Embedded backend. A rusqlite connection is not `Sync`, so the single
/// connection sits behind a mutex; lookups are point reads and the importer
/// runs offline, so the serialization is invisible at our request rates.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL keeps a reader responsive while another process imports.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }

    /// Raw connection access. Exposed for tests; not part of the store
    /// contract.
    #[doc(hidden)]
    pub fn raw(&self) -> &Mutex<Connection> {
        &self.conn
    }
}

#[async_trait]
impl ShareStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS shares (
                national_code TEXT PRIMARY KEY,
                total_shares INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    async fn upsert(&self, national_code: &str, total_shares: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO shares (national_code, total_shares) VALUES (?1, ?2)",
            params![national_code, total_shares],
        )?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[ShareRecord]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO shares (national_code, total_shares) VALUES (?1, ?2)",
            )?;
            for record in records {
                stmt.execute(params![record.national_code, record.total_shares])?;
            }
        }
        // An error above drops the transaction uncommitted, rolling the
        // whole batch back.
        tx.commit()?;
        Ok(records.len())
    }

    async fn get(&self, national_code: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let shares = conn
            .query_row(
                "SELECT total_shares FROM shares WHERE national_code = ?1",
                params![national_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(shares)
    }
}
