//! LINE Messaging API client implementation

use crate::error::{Error, Result};
use crate::models::{OutgoingMessage, PushRequest, ReplyRequest};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.line.me";
const REPLY_PATH: &str = "/v2/bot/message/reply";
const PUSH_PATH: &str = "/v2/bot/message/push";

/// Provider limit for a single text message
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Clone)]
pub struct LineClientConfig {
    /// Channel access token (bearer credential)
    pub channel_access_token: String,
    /// Scheme and host of the Messaging API
    pub api_base: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl LineClientConfig {
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineClient {
    client: reqwest::Client,
    api_base: String,
    headers: HeaderMap,
}

impl LineClient {
    pub fn new(config: LineClientConfig) -> Result<Self> {
        if config.channel_access_token.trim().is_empty() {
            return Err(Error::Other(
                "channel access token must not be empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.channel_access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Other(format!("Invalid auth header: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Reply to an inbound event using its one-shot reply token
    pub async fn send_reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let body = ReplyRequest {
            reply_token: reply_token.to_string(),
            messages: vec![OutgoingMessage::text(truncate_text(text))],
        };
        self.post(REPLY_PATH, &body).await
    }

    /// Push a message to a user outside the reply window
    pub async fn send_push(&self, to: &str, text: &str) -> Result<()> {
        let body = PushRequest {
            to: to.to_string(),
            messages: vec![OutgoingMessage::text(truncate_text(text))],
        };
        self.post(PUSH_PATH, &body).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.api_base, path);

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message,
                status: status.as_u16(),
            });
        }

        tracing::debug!("LINE request to {} succeeded", path);
        Ok(())
    }
}

/// Cut a text down to the provider limit, counting chars rather than bytes
fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_keeps_short_text() {
        assert_eq!(truncate_text("こんにちは"), "こんにちは");
    }

    #[test]
    fn test_truncate_text_counts_chars() {
        let long: String = "団".repeat(MAX_TEXT_CHARS + 10);
        let cut = truncate_text(&long);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_new_rejects_empty_token() {
        let result = LineClient::new(LineClientConfig::new("  "));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_trims_api_base() {
        let mut config = LineClientConfig::new("token");
        config.api_base = "http://localhost:9000/".to_string();
        let client = LineClient::new(config).unwrap();
        assert_eq!(client.api_base, "http://localhost:9000");
    }
}
