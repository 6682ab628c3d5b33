// Saham - Telegram Bot
// Long-polling front-end over the lookup service

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use saham::telegram::{mention_html, BotClient, Message, TelegramError};
use saham::{store, Config, LookupOutcome, LookupService};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

const GREETING_TAIL: &str = "! برای استعلام تعداد سهام قوامین، کدملی خود را ارسال کنید.";
const INVALID_REPLY: &str = "لطفاً یک کدملی معتبر ۱۰ رقمی (فقط شامل اعداد) ارسال کنید.";

fn found_reply(code: &str, total_shares: i64) -> String {
    format!("کدملی {code} دارای {total_shares} سهم می‌باشد.")
}

fn not_found_reply(code: &str) -> String {
    format!("متاسفانه کدملی {code} در سیستم یافت نشد. لطفاً از صحت کدملی اطمینان حاصل کنید.")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("saham=info".parse()?))
        .with_target(false)
        .init();

    let config = Config::from_env();
    let token = config
        .bot_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN is not set")?;

    // Same guard as the web server: without an import there is nothing
    // to answer.
    if let Some(path) = store::sqlite_file(&config.database_url) {
        if !path.exists() {
            eprintln!("❌ Database file '{}' not found.", path.display());
            eprintln!("   Run: saham import");
            eprintln!("   to load the register first.");
            std::process::exit(1);
        }
    }

    let share_store = store::connect(&config.database_url)
        .await
        .context("Failed to open the share store")?;
    let lookups = LookupService::new(Arc::from(share_store));
    let client = BotClient::new(&token)?;

    info!("bot started, polling for updates");
    run_loop(&client, &lookups).await
}

async fn run_loop(client: &BotClient, lookups: &LookupService) -> Result<()> {
    let mut offset: Option<i64> = None;

    loop {
        let updates = match client.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                error!(error = %err, "poll failed, retrying");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            if let Err(err) = handle_message(client, lookups, &message).await {
                error!(chat = message.chat.id, error = %err, "failed to answer");
            }
        }
    }
}

async fn handle_message(
    client: &BotClient,
    lookups: &LookupService,
    message: &Message,
) -> Result<(), TelegramError> {
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let input = text.trim();
    let chat_id = message.chat.id;

    if input.starts_with("/start") {
        let greeting = match &message.from {
            Some(user) => format!("سلام {}{GREETING_TAIL}", mention_html(user)),
            None => format!("سلام{GREETING_TAIL}"),
        };
        client.send_html(chat_id, &greeting).await?;
        if let Some(user) = &message.from {
            info!(user = user.id, "user started the bot");
        }
        return Ok(());
    }
    if input.starts_with('/') {
        // Unknown commands are ignored, like any non-text update.
        return Ok(());
    }

    match lookups.lookup(input).await {
        LookupOutcome::Found(total_shares) => {
            client
                .send_message(chat_id, &found_reply(input, total_shares))
                .await?;
            info!(code = input, total_shares, "shares found");
        }
        LookupOutcome::NotFound => {
            client.send_message(chat_id, &not_found_reply(input)).await?;
            info!(code = input, "national code not found");
        }
        LookupOutcome::InvalidFormat => {
            client.send_message(chat_id, INVALID_REPLY).await?;
        }
    }
    Ok(())
}
