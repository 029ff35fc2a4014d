// =============================================================================
// Telegram notifier
// =============================================================================
//
// Messages are sent as HTML with link previews enabled. A missing bot token
// or target chat turns every send into a logged no-op so the bot can run
// without Telegram configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `chat_id`, or to the default chat when `None`.
    async fn send(&self, text: &str, chat_id: Option<&str>) -> Result<()>;
}

pub struct TelegramNotifier {
    api_base: String,
    token: Option<String>,
    default_chat: Option<String>,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn with_client(client: reqwest::Client, token: Option<String>, default_chat: Option<String>) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            default_chat: default_chat.filter(|c| !c.trim().is_empty()),
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("default_chat", &self.default_chat)
            .finish()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text), name = "telegram_send")]
    async fn send(&self, text: &str, chat_id: Option<&str>) -> Result<()> {
        let Some(token) = self.token.as_deref() else {
            warn!("TELEGRAM_TOKEN missing, message dropped");
            return Ok(());
        };
        let Some(target) = chat_id.or(self.default_chat.as_deref()) else {
            warn!("no target chat (TELEGRAM_CHAT unset), message dropped");
            return Ok(());
        };

        let resp = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_base, token))
            .json(&json!({
                "chat_id": target,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": false,
            }))
            .send()
            .await
            .context("POST sendMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage returned {}: {}", status, body);
        }

        debug!(chat = target, len = text.len(), "telegram message sent");
        Ok(())
    }
}
