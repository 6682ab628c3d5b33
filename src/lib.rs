// Saham - share register import and lookup
// Exposes all modules for use in the CLI, the bot, the web server, and tests

pub mod clean;
pub mod config;
pub mod importer;
pub mod lookup;
pub mod store;

#[cfg(feature = "bot")]
pub mod telegram;

// Re-export commonly used types
pub use config::Config;
pub use importer::{ImportError, ImportReport, Importer};
pub use lookup::{validate_code, LookupOutcome, LookupService};
pub use store::{connect, ShareRecord, ShareStore, SqliteStore, StoreError};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
