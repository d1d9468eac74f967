//! Telegram Bot API delivery

use super::Notifier;
use crate::config::{SecretString, TelegramConfig};
use crate::domain::{RecupError, Result, SubscriberId};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde_json::json;
use std::time::Duration;

pub struct TelegramNotifier {
    http_client: Client,
    api_base: String,
    bot_token: SecretString,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString, config: &TelegramConfig) -> Result<Self> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                RecupError::Configuration(format!("Failed to build Telegram client: {e}"))
            })?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base,
            self.bot_token.expose_secret().as_ref(),
            method
        )
    }

    /// Maps a Bot API reply to `Ok` only when `ok` is true
    async fn check_reply(response: reqwest::Response, method: &str) -> Result<()> {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status.is_success() && body["ok"].as_bool() == Some(true) {
            return Ok(());
        }

        let description = body["description"].as_str().unwrap_or("Unknown error");
        Err(RecupError::Notification(format!(
            "{method} failed with status {status}: {description}"
        )))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, to: &SubscriberId, html: &str) -> Result<()> {
        let body = json!({
            "chat_id": to.as_str(),
            "text": html,
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        });

        let response = self
            .http_client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| RecupError::Notification(format!("sendMessage: {e}")))?;

        Self::check_reply(response, "sendMessage").await?;
        tracing::debug!(subscriber = %to, "Message delivered");
        Ok(())
    }

    async fn send_document(
        &self,
        to: &SubscriberId,
        filename: &str,
        content: &[u8],
        caption: Option<&str>,
    ) -> Result<()> {
        let part = Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| RecupError::Notification(format!("sendDocument: {e}")))?;

        let mut form = Form::new()
            .text("chat_id", to.as_str().to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML");
        }

        let response = self
            .http_client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecupError::Notification(format!("sendDocument: {e}")))?;

        Self::check_reply(response, "sendDocument").await?;
        tracing::debug!(subscriber = %to, filename, "Document delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
