// Prints the chats the bot has seen, to find the value for TELEGRAM_CHAT_ID.
// Message the bot (or add it to the target group) first, then run this once.

use anyhow::{Context, Result};
use common::config::{Credentials, Settings};
use common::telegram::TelegramNotifier;
use common::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    telemetry::init_logging(&settings.observability.log_level, None)?;

    let credentials = Credentials::from_env_unchecked()?;
    credentials
        .require(&["TELEGRAM_BOT_TOKEN"])
        .context("The bot token is needed to read updates")?;

    let notifier = TelegramNotifier::new(
        &settings.telegram,
        credentials.telegram_bot_token,
        String::new(),
        settings.detector.http_timeout_seconds,
    )?;

    let chats = notifier.discover_chats().await?;
    if chats.is_empty() {
        info!("No chats found; send the bot a message and try again");
    }
    for chat in chats {
        let name = chat
            .title
            .or(chat.username.map(|u| format!("@{}", u)))
            .unwrap_or_default();
        println!("Chat ID: {}\t{}\t{}", chat.id, chat.kind, name);
    }

    Ok(())
}
