// Storage layer for the share register. One table, two interchangeable
// backends: an embedded SQLite file for single-host deployments and a
// networked PostgreSQL server behind the `postgres` cargo feature. The
// backend is picked once at startup from the connection string; everything
// above this module only ever sees the `ShareStore` trait.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod sqlite;
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// One row of the register: who, and how many shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub national_code: String,
    pub total_shares: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot be reached or used at all (bad scheme, poisoned
    /// connection, feature compiled out).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// The storage contract shared by the importer and the lookup service.
///
/// `get` on an absent key is `Ok(None)`, never an error; `Err` is reserved
/// for infrastructure failures. `upsert_batch` runs inside a single storage
/// transaction: either every row lands or none do.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Create the `shares` table if it does not exist. Never drops or
    /// rewrites existing data; safe to call on every start.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert or overwrite the full row for one national code.
    async fn upsert(&self, national_code: &str, total_shares: i64) -> Result<(), StoreError>;

    /// Upsert every record in one transaction. Returns the number of rows
    /// written; on any failure the whole batch rolls back.
    async fn upsert_batch(&self, records: &[ShareRecord]) -> Result<usize, StoreError>;

    /// Point read of the share count for one national code.
    async fn get(&self, national_code: &str) -> Result<Option<i64>, StoreError>;
}

/// Pick a backend from the connection string: `postgres://` (or
/// `postgresql://`) selects the networked store, anything else is treated
/// as a SQLite path (an optional `sqlite://` prefix is stripped).
pub async fn connect(database_url: &str) -> Result<Box<dyn ShareStore>, StoreError> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        #[cfg(feature = "postgres")]
        {
            let store = PostgresStore::connect(database_url).await?;
            return Ok(Box::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            return Err(StoreError::Unavailable(format!(
                "{database_url} needs the `postgres` feature, which this build lacks"
            )));
        }
    }

    let path = database_url
        .strip_prefix("sqlite://")
        .unwrap_or(database_url);
    Ok(Box::new(SqliteStore::open(path)?))
}

/// The filesystem path behind a SQLite connection string, when there is
/// one. Postgres URLs and `:memory:` have no backing file. The front-end
/// binaries use this to refuse to start before the first import.
pub fn sqlite_file(database_url: &str) -> Option<&Path> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        return None;
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .unwrap_or(database_url);
    if path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_plain_path_is_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shares.db");
        let store = connect(path.to_str().unwrap()).await.unwrap();

        store.ensure_schema().await.unwrap();
        store.upsert("0061339326", 1500).await.unwrap();
        assert_eq!(store.get("0061339326").await.unwrap(), Some(1500));
    }

    #[tokio::test]
    async fn test_connect_strips_sqlite_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shares.db");
        let url = format!("sqlite://{}", path.display());
        let store = connect(&url).await.unwrap();

        store.ensure_schema().await.unwrap();
        assert_eq!(store.get("0061339326").await.unwrap(), None);
        assert!(path.exists());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_connect_postgres_url_without_feature_fails() {
        let err = connect("postgres://localhost/saham").await.err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_sqlite_file_resolution() {
        assert_eq!(sqlite_file("stock_data.db"), Some(Path::new("stock_data.db")));
        assert_eq!(sqlite_file("sqlite://data/shares.db"), Some(Path::new("data/shares.db")));
        assert_eq!(sqlite_file(":memory:"), None);
        assert_eq!(sqlite_file("postgres://localhost/saham"), None);
    }
}
