//! Telegram Bot API client for staff notifications

use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;

/// Bot API client bound to one chat
#[derive(Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(http_client: reqwest::Client, api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Build from configuration; `None` when the token or chat is missing
    pub fn from_config(http_client: reqwest::Client, config: &TelegramConfig) -> Option<Self> {
        let token = config.bot_token.as_deref().filter(|t| !t.trim().is_empty())?;
        let chat_id = config.chat_id.as_deref().filter(|c| !c.trim().is_empty())?;
        Some(Self::new(http_client, &config.api_base, token, chat_id))
    }

    /// Send an HTML-formatted message to the configured chat
    pub async fn send_html(&self, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send Telegram message: {}", e))?;

        let status = response.status();
        let body: BotApiResponse = response.json().await.unwrap_or(BotApiResponse {
            ok: false,
            description: Some(format!("Unexpected response ({})", status)),
        });

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(body
                .description
                .unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}
