//! Outbound messages to subscribers
//!
//! Messages are HTML-subset text (`<b>`, `<code>`). Documents are named binary
//! attachments, typically the booking confirmation PDF.

pub mod log;
pub mod telegram;

pub use self::log::LogNotifier;
pub use telegram::TelegramNotifier;

use crate::config::TelegramConfig;
use crate::domain::{Result, SubscriberId};
use async_trait::async_trait;
use std::sync::Arc;

/// Delivery channel for subscriber notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a formatted text message
    async fn send_message(&self, to: &SubscriberId, html: &str) -> Result<()>;

    /// Sends a named binary document with an optional caption
    async fn send_document(
        &self,
        to: &SubscriberId,
        filename: &str,
        content: &[u8],
        caption: Option<&str>,
    ) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Telegram when a bot token is configured, otherwise log-only
pub fn build_notifier(config: &TelegramConfig) -> Result<Arc<dyn Notifier>> {
    match &config.bot_token {
        Some(token) => Ok(Arc::new(TelegramNotifier::new(token.clone(), config)?)),
        None => {
            tracing::warn!("No Telegram bot token configured, notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
