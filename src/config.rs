use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "stock_data.db";
pub const DEFAULT_SOURCE_FILE: &str = "saham.end.csv";
pub const DEFAULT_CODE_COLUMN: &str = "کد ملی";
pub const DEFAULT_SHARES_COLUMN: &str = "تعدادكل سهام";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Runtime configuration, resolved once at startup and passed to the pieces
/// that need it. Nothing below this layer reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the share register lives. A plain path (or `sqlite://` URL)
    /// selects the embedded backend, `postgres://` the networked one.
    pub database_url: String,
    /// CSV export of the shareholder register.
    pub source_path: PathBuf,
    /// Header of the national-code column in the source file.
    pub code_column: String,
    /// Header of the total-shares column in the source file.
    pub shares_column: String,
    /// Telegram bot token, only needed by the bot binary.
    pub bot_token: Option<String>,
    /// Listen address for the web front-end.
    pub bind_addr: String,
}

impl Config {
    /// Build a config from the process environment, falling back to the
    /// defaults above. Call `dotenvy::dotenv()` first if a `.env` file
    /// should be honored.
    pub fn from_env() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            source_path: PathBuf::from(env_or("SAHAM_SOURCE", DEFAULT_SOURCE_FILE)),
            code_column: env_or("SAHAM_CODE_COLUMN", DEFAULT_CODE_COLUMN),
            shares_column: env_or("SAHAM_SHARES_COLUMN", DEFAULT_SHARES_COLUMN),
            bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            bind_addr: env_or("SAHAM_BIND_ADDR", DEFAULT_BIND_ADDR),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}
