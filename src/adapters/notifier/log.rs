//! Notifier that only writes to the log

use super::Notifier;
use crate::domain::{Result, SubscriberId};
use async_trait::async_trait;

/// Logs every outbound message instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, to: &SubscriberId, html: &str) -> Result<()> {
        tracing::info!(subscriber = %to, message = %html, "Notification (not delivered)");
        Ok(())
    }

    async fn send_document(
        &self,
        to: &SubscriberId,
        filename: &str,
        content: &[u8],
        caption: Option<&str>,
    ) -> Result<()> {
        tracing::info!(
            subscriber = %to,
            filename,
            size_bytes = content.len(),
            caption = caption.unwrap_or(""),
            "Document (not delivered)"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
