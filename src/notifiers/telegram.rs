//! Telegram bot notifier

use super::{http_client, Notifier};
use crate::error::JobError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// A chat to notify, optionally as a reply to an existing message
///
/// In configuration this is either `"123"` or `["123", "45"]`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChatTarget {
    Chat(String),
    Reply(String, String),
}

impl ChatTarget {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::Chat(id) | Self::Reply(id, _) => id,
        }
    }

    pub fn reply_to(&self) -> Option<&str> {
        match self {
            Self::Chat(_) => None,
            Self::Reply(_, reply) => Some(reply),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TelegramParams {
    pub bot_token: String,
    pub chat_ids: Vec<ChatTarget>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    params: TelegramParams,
}

impl TelegramNotifier {
    pub fn new(params: TelegramParams) -> Self {
        Self { params }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.params.api_url.trim_end_matches('/'),
            self.params.bot_token
        )
    }

    fn send(&self, text: &str) -> Result<()> {
        let client = http_client()?;

        for target in &self.params.chat_ids {
            let response: TelegramResponse = client
                .get(self.endpoint())
                .query(&query_for(target, text))
                .send()
                .with_context(|| {
                    format!("Failed to send Telegram message to {}", target.chat_id())
                })?
                .json()
                .context("Failed to parse Telegram response")?;

            if !response.ok {
                anyhow::bail!(
                    "Telegram rejected message for chat {}: {}",
                    target.chat_id(),
                    response.description.as_deref().unwrap_or("unknown error")
                );
            }
            debug!("Telegram message sent to {}", target.chat_id());
        }

        Ok(())
    }
}

fn query_for<'a>(target: &'a ChatTarget, text: &'a str) -> Vec<(&'static str, &'a str)> {
    let mut query = vec![("chat_id", target.chat_id()), ("text", text)];
    if let Some(reply) = target.reply_to() {
        query.push(("reply_to_message_id", reply));
    }
    query
}

impl Notifier for TelegramNotifier {
    fn notify(&self, message: &str) -> Result<(), JobError> {
        info!(
            "Sending Telegram notification to {} chat(s)",
            self.params.chat_ids.len()
        );
        // reqwest errors embed the request URL, which carries the bot token
        self.send(message).map_err(|e| {
            let redacted = format!("{:#}", e).replace(&self.params.bot_token, "<redacted>");
            JobError::notify(self.name(), anyhow::anyhow!(redacted))
        })
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
