// One-shot batch load of the register export into the share store.
// Read everything, clean row by row, then hand the survivors to the
// store as one transaction so readers never observe a half-finished
// import.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, info};

use crate::clean;
use crate::config::Config;
use crate::store::{ShareRecord, ShareStore, StoreError};

const PROGRESS_EVERY: usize = 10_000;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The export does not carry a required column under the configured
    /// header. Raised before anything is written.
    #[error("source is missing the required column \"{0}\"")]
    SchemaMismatch(String),

    #[error("failed to read source: {0}")]
    Source(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for one import run.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub rows_read: usize,
    /// Rows with an empty national-code or share-count cell.
    pub dropped_missing: usize,
    /// Rows with a non-numeric code or an uncoercible share count.
    pub dropped_invalid: usize,
    pub imported: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

pub struct Importer {
    source_path: PathBuf,
    code_column: String,
    shares_column: String,
}

impl Importer {
    pub fn new(config: &Config) -> Self {
        Self {
            source_path: config.source_path.clone(),
            code_column: config.code_column.clone(),
            shares_column: config.shares_column.clone(),
        }
    }

    /// Run the import against `store`.
    ///
    /// The store is only touched after the whole source has been read and
    /// cleaned; any error before that point leaves it exactly as it was.
    /// Surviving rows land through one `upsert_batch` transaction, so a
    /// re-run with the same file is idempotent and a failed run is
    /// invisible.
    pub async fn run(&self, store: &dyn ShareStore) -> Result<ImportReport, ImportError> {
        let started_at = Utc::now();

        if !self.source_path.exists() {
            return Err(ImportError::SourceNotFound(self.source_path.clone()));
        }

        info!(source = %self.source_path.display(), "reading register export");
        let mut reader = csv::Reader::from_path(&self.source_path)?;
        let headers = reader.headers()?.clone();
        let code_idx = column_index(&headers, &self.code_column)
            .ok_or_else(|| ImportError::SchemaMismatch(self.code_column.clone()))?;
        let shares_idx = column_index(&headers, &self.shares_column)
            .ok_or_else(|| ImportError::SchemaMismatch(self.shares_column.clone()))?;

        let mut rows_read = 0usize;
        let mut dropped_missing = 0usize;
        let mut dropped_invalid = 0usize;
        let mut records: Vec<ShareRecord> = Vec::new();

        for result in reader.records() {
            let row = result?;
            rows_read += 1;
            if rows_read % PROGRESS_EVERY == 0 {
                info!(rows_read, "still reading");
            }

            let code_cell = row.get(code_idx).unwrap_or("");
            let shares_cell = row.get(shares_idx).unwrap_or("");

            let code = match clean::clean_code(code_cell) {
                Some(code) => code,
                None => {
                    dropped_missing += 1;
                    debug!(row = rows_read, "dropped: empty national code");
                    continue;
                }
            };
            if shares_cell.trim().is_empty() {
                dropped_missing += 1;
                debug!(row = rows_read, "dropped: empty share count");
                continue;
            }
            if !code.chars().all(|c| c.is_ascii_digit()) {
                dropped_invalid += 1;
                debug!(row = rows_read, code = %code, "dropped: non-numeric national code");
                continue;
            }
            let total_shares = match clean::parse_share_count(shares_cell) {
                Some(n) => n,
                None => {
                    dropped_invalid += 1;
                    debug!(row = rows_read, code = %code, "dropped: unusable share count");
                    continue;
                }
            };

            records.push(ShareRecord {
                national_code: code,
                total_shares,
            });
        }

        store.ensure_schema().await?;
        let imported = store.upsert_batch(&records).await?;

        let report = ImportReport {
            rows_read,
            dropped_missing,
            dropped_invalid,
            imported,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            rows_read = report.rows_read,
            imported = report.imported,
            dropped_missing = report.dropped_missing,
            dropped_invalid = report.dropped_invalid,
            "import finished"
        );
        Ok(report)
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}
