use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use saham::{store, Config, Importer, LookupOutcome, LookupService};

#[derive(Parser)]
#[command(name = "saham", version, about = "Share register import and lookup")]
struct Cli {
    /// Database path or URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the register export into the share store
    Import {
        /// CSV export of the register (overrides SAHAM_SOURCE)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Header of the national-code column
        #[arg(long)]
        code_column: Option<String>,

        /// Header of the share-count column
        #[arg(long)]
        shares_column: Option<String>,
    },
    /// Look up the share count for one national code
    Lookup {
        /// National code (10 digits)
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("saham=info".parse()?))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_url = db;
    }

    match cli.command {
        Command::Import {
            source,
            code_column,
            shares_column,
        } => {
            if let Some(source) = source {
                config.source_path = source;
            }
            if let Some(name) = code_column {
                config.code_column = name;
            }
            if let Some(name) = shares_column {
                config.shares_column = name;
            }
            run_import(&config).await
        }
        Command::Lookup { code } => run_lookup(&config, &code).await,
    }
}

async fn run_import(config: &Config) -> Result<()> {
    println!("🗄️  Share Register Import - CSV → {}", config.database_url);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = store::connect(&config.database_url)
        .await
        .context("Failed to open the share store")?;

    println!("\n📂 Reading {}...", config.source_path.display());
    let report = Importer::new(config).run(store.as_ref()).await?;

    println!("✓ Rows read: {}", report.rows_read);
    println!("✓ Imported:  {}", report.imported);
    if report.dropped_missing > 0 {
        println!("✓ Dropped (empty cells): {}", report.dropped_missing);
    }
    if report.dropped_invalid > 0 {
        println!("✓ Dropped (unusable values): {}", report.dropped_invalid);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "🎉 Import complete in {:.1}s",
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );
    Ok(())
}

async fn run_lookup(config: &Config, code: &str) -> Result<()> {
    let store = store::connect(&config.database_url)
        .await
        .context("Failed to open the share store")?;
    let service = LookupService::new(Arc::from(store));

    match service.lookup(code).await {
        LookupOutcome::Found(total_shares) => println!("✓ {code}: {total_shares} shares"),
        LookupOutcome::NotFound => println!("✗ {code}: not found"),
        LookupOutcome::InvalidFormat => {
            println!("✗ {code}: not a valid 10-digit national code")
        }
    }
    Ok(())
}
