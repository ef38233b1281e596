//! Notification channels for backup outcomes

pub mod slack;
pub mod telegram;

use crate::error::JobError;
use anyhow::Context;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use slack::{SlackNotifier, SlackParams};
pub use telegram::{ChatTarget, TelegramNotifier, TelegramParams};

/// Timeout applied to every notification HTTP request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for notification channels
pub trait Notifier: Send + Sync {
    /// Deliver `message`, failing if the channel rejected it
    fn notify(&self, message: &str) -> Result<(), JobError>;

    /// Channel name used in logs and errors
    fn name(&self) -> &str;
}

/// Recognized notifier type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Slack,
    Telegram,
}

impl NotifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Telegram => "telegram",
        }
    }
}

impl FromStr for NotifierKind {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "slack" => Ok(Self::Slack),
            "telegram" => Ok(Self::Telegram),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn http_client() -> anyhow::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Recording notifier for testing the pipeline
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock notifier recording every delivery attempt
    #[derive(Clone)]
    pub struct MockNotifier {
        name: String,
        /// Every message passed to `notify`, including failed attempts
        pub messages: Arc<Mutex<Vec<String>>>,
        fail_with: Option<String>,
    }

    impl MockNotifier {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                messages: Arc::new(Mutex::new(Vec::new())),
                fail_with: None,
            }
        }

        /// Every delivery fails with `message`
        pub fn failing(name: &str, message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::new(name)
            }
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        /// Success notifications received
        pub fn successes(&self) -> Vec<String> {
            self.messages()
                .into_iter()
                .filter(|m| m.starts_with("\u{1F49A}"))
                .collect()
        }

        /// Failure notifications received
        pub fn failures(&self) -> Vec<String> {
            self.messages()
                .into_iter()
                .filter(|m| m.starts_with("\u{1F494}"))
                .collect()
        }
    }

    impl Notifier for MockNotifier {
        fn notify(&self, message: &str) -> Result<(), JobError> {
            self.messages.lock().unwrap().push(message.to_string());

            match &self.fail_with {
                Some(error) => Err(JobError::notify(&self.name, anyhow::anyhow!("{}", error))),
                None => Ok(()),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}
