//! Outbound notification channel.
//!
//! A notification is an ordered list of text parts delivered to one user as
//! a single logical message.

pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::NotifyConfig;

pub use webhook::WebhookSender;

/// Delivers notifications to users. Must be safe for concurrent use.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, user_id: &str, messages: &[String]) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, user_id: &str, messages: &[String]) -> Result<()> {
        for (i, text) in messages.iter().enumerate() {
            log::info!("[notify {}] part {}/{}: {}", user_id, i + 1, messages.len(), text);
        }
        Ok(())
    }
}

/// Build the sender described by the `[notify]` config section.
pub fn from_config(config: &NotifyConfig) -> Result<Arc<dyn MessageSender>> {
    match &config.webhook_url {
        Some(url) => {
            log::info!("Delivering notifications to {}", url);
            Ok(Arc::new(WebhookSender::new(url, config.resolved_token())?))
        }
        None => {
            log::info!("No webhook configured, notifications will only be logged");
            Ok(Arc::new(LogSender))
        }
    }
}
