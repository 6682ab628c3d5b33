use std::sync::Arc;

use tracing::{error, warn};

use crate::clean;
use crate::store::ShareStore;

pub const NATIONAL_CODE_LEN: usize = 10;

/// What one raw lookup request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(i64),
    NotFound,
    InvalidFormat,
}

/// The one validation rule, applied at every entry point: after trimming
/// and digit normalization the input must be exactly ten ASCII digits.
/// Returns the canonical form, which is also the storage key.
pub fn validate_code(raw: &str) -> Option<String> {
    let normalized = clean::normalize_digits(raw.trim());
    if normalized.len() == NATIONAL_CODE_LEN && normalized.chars().all(|c| c.is_ascii_digit()) {
        Some(normalized)
    } else {
        None
    }
}

/// Answers "how many shares does this code hold?" for every front-end.
pub struct LookupService {
    store: Arc<dyn ShareStore>,
}

impl LookupService {
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self { store }
    }

    /// Resolve one request. Malformed input never reaches the store. A
    /// store failure is an operator problem, not the asker's: it is logged
    /// here and reported to the caller as not-found.
    pub async fn lookup(&self, raw: &str) -> LookupOutcome {
        let Some(code) = validate_code(raw) else {
            warn!(input = raw, "rejected malformed national code");
            return LookupOutcome::InvalidFormat;
        };

        match self.store.get(&code).await {
            Ok(Some(total_shares)) => LookupOutcome::Found(total_shares),
            Ok(None) => LookupOutcome::NotFound,
            Err(err) => {
                error!(code = %code, error = %err, "share lookup failed, answering not-found");
                LookupOutcome::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    async fn service_with(rows: &[(&str, i64)]) -> LookupService {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        for (code, shares) in rows {
            store.upsert(code, *shares).await.unwrap();
        }
        LookupService::new(Arc::new(store))
    }

    // -- Validation rule --

    #[test]
    fn validate_accepts_exactly_ten_digits() {
        assert_eq!(validate_code("0011223344"), Some("0011223344".to_string()));
        assert_eq!(validate_code(" 0061339326 "), Some("0061339326".to_string()));
    }

    #[test]
    fn validate_canonicalizes_persian_digits() {
        assert_eq!(validate_code("۰۰۶۱۳۳۹۳۲۶"), Some("0061339326".to_string()));
    }

    #[test]
    fn validate_rejects_wrong_length() {
        assert_eq!(validate_code("123456789"), None);
        assert_eq!(validate_code("12345678901"), None);
        assert_eq!(validate_code(""), None);
    }

    #[test]
    fn validate_rejects_non_digits() {
        assert_eq!(validate_code("00112233x4"), None);
        assert_eq!(validate_code("کد ملی"), None);
        assert_eq!(validate_code("00112 3344"), None);
    }

    // -- Lookup outcomes --

    #[tokio::test]
    async fn test_lookup_present_code() {
        let service = service_with(&[("0011223344", 500)]).await;
        assert_eq!(
            service.lookup("0011223344").await,
            LookupOutcome::Found(500)
        );
    }

    #[tokio::test]
    async fn test_lookup_valid_absent_code() {
        let service = service_with(&[("0011223344", 500)]).await;
        assert_eq!(service.lookup("9999999999").await, LookupOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_malformed_input() {
        let service = service_with(&[]).await;
        assert_eq!(service.lookup("12a34").await, LookupOutcome::InvalidFormat);
        assert_eq!(service.lookup("section 9").await, LookupOutcome::InvalidFormat);
        assert_eq!(service.lookup("12345").await, LookupOutcome::InvalidFormat);
    }

    #[tokio::test]
    async fn test_lookup_persian_digit_input_finds_ascii_row() {
        let service = service_with(&[("0061339326", 1500)]).await;
        assert_eq!(
            service.lookup("۰۰۶۱۳۳۹۳۲۶").await,
            LookupOutcome::Found(1500)
        );
    }

    #[tokio::test]
    async fn test_lookup_invalid_input_skips_the_store() {
        // No schema: any store access would error and come back NotFound,
        // so InvalidFormat proves the store was never touched.
        let store = SqliteStore::open_in_memory().unwrap();
        let service = LookupService::new(Arc::new(store));
        assert_eq!(service.lookup("not-a-code").await, LookupOutcome::InvalidFormat);
    }

    #[tokio::test]
    async fn test_lookup_store_failure_degrades_to_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = LookupService::new(Arc::new(store));
        // Valid code, but the shares table was never created.
        assert_eq!(service.lookup("0011223344").await, LookupOutcome::NotFound);
    }
}
