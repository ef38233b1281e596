//! Slack notifier using the Web API `chat.postMessage` method

use super::{http_client, Notifier};
use crate::error::JobError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SlackParams {
    pub slack_api_token: String,
    pub slack_channels: Vec<String>,
    /// Override for the Web API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Every Web API response carries `ok`; failures add an `error` code
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    params: SlackParams,
}

impl SlackNotifier {
    pub fn new(params: SlackParams) -> Self {
        Self { params }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat.postMessage", self.params.api_url.trim_end_matches('/'))
    }

    fn post(&self, text: &str) -> Result<()> {
        let client = http_client()?;

        for channel in &self.params.slack_channels {
            let response: SlackResponse = client
                .post(self.endpoint())
                .bearer_auth(&self.params.slack_api_token)
                .json(&PostMessage { channel, text })
                .send()
                .with_context(|| format!("Failed to post Slack message to {}", channel))?
                .json()
                .context("Failed to parse Slack response")?;

            check_response(channel, response)?;
            debug!("Slack message posted to {}", channel);
        }

        Ok(())
    }
}

fn check_response(channel: &str, response: SlackResponse) -> Result<()> {
    if response.ok {
        return Ok(());
    }
    anyhow::bail!(
        "Slack rejected message for channel {}: {}",
        channel,
        response.error.as_deref().unwrap_or("unknown error")
    )
}

impl Notifier for SlackNotifier {
    fn notify(&self, message: &str) -> Result<(), JobError> {
        info!(
            "Sending Slack notification to {} channel(s)",
            self.params.slack_channels.len()
        );
        self.post(message)
            .map_err(|e| JobError::notify(self.name(), e))
    }

    fn name(&self) -> &str {
        "slack"
    }
}
