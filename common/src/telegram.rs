// Telegram Bot API notifier

use crate::config::TelegramConfig;
use crate::errors::NotifyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};

/// Notifier trait defines the interface for delivering alert text
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<UpdateMessage>,
    #[serde(default)]
    channel_post: Option<UpdateMessage>,
    #[serde(default)]
    my_chat_member: Option<UpdateMessage>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
    chat: ChatInfo,
}

/// A chat the bot has seen in its pending updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

// Request URLs embed the bot token
fn redact(err: reqwest::Error) -> NotifyError {
    NotifyError::Http(err.without_url())
}

/// TelegramNotifier posts alerts through `sendMessage`
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a new TelegramNotifier with the specified timeout
    pub fn new(
        config: &TelegramConfig,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, NotifyError> {
        let status = response.status();
        let body = response.text().await.map_err(redact)?;
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| NotifyError::Rejected(format!("unreadable response: {}", e)))?;
        if !parsed.ok {
            return Err(NotifyError::Rejected(
                parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        Ok(parsed.result)
    }

    /// List the distinct chats found in the bot's pending updates
    #[instrument(skip(self))]
    pub async fn discover_chats(&self) -> Result<Vec<ChatInfo>, NotifyError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .send()
            .await
            .map_err(redact)?;
        let updates: Vec<Update> = Self::check(response).await?.unwrap_or_default();

        let mut chats = BTreeMap::new();
        for update in updates {
            for message in [update.message, update.channel_post, update.my_chat_member]
                .into_iter()
                .flatten()
            {
                chats.entry(message.chat.id).or_insert(message.chat);
            }
        }

        Ok(chats.into_values().collect())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text), fields(chat_id = %self.chat_id, length = text.len()))]
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": false,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(redact)?;
        Self::check::<serde_json::Value>(response).await?;

        info!("Alert sent to Telegram");
        Ok(())
    }
}
