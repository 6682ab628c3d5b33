use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{ShareRecord, ShareStore, StoreError};

/// Networked backend, for deployments where the register outgrows one file
/// or more than one host needs to serve lookups. Same contract as the
/// embedded store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ShareStore for PostgresStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS shares (
                national_code TEXT PRIMARY KEY,
                total_shares BIGINT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert(&self, national_code: &str, total_shares: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shares (national_code, total_shares) VALUES ($1, $2)
             ON CONFLICT (national_code) DO UPDATE SET total_shares = EXCLUDED.total_shares",
        )
        .bind(national_code)
        .bind(total_shares)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[ShareRecord]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO shares (national_code, total_shares) VALUES ($1, $2)
                 ON CONFLICT (national_code) DO UPDATE SET total_shares = EXCLUDED.total_shares",
            )
            .bind(&record.national_code)
            .bind(record.total_shares)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(records.len())
    }

    async fn get(&self, national_code: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT total_shares FROM shares WHERE national_code = $1")
            .bind(national_code)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<i64, _>(0)?)),
            None => Ok(None),
        }
    }
}
