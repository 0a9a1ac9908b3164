// Minimal LINE Messaging API client: reply and push, bearer token, short
// timeout. Send failures are logged and recorded by the caller, never
// propagated to the webhook response.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;

const LINE_API_BASE: &str = "https://api.line.me";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default, rename = "sentMessages")]
    sent_messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: LINE_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Reply to a webhook event. Returns the LINE id of the sent message
    /// when the API reports one.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<Option<String>> {
        self.send(
            "/v2/bot/message/reply",
            json!({
                "replyToken": reply_token,
                "messages": [{ "type": "text", "text": text }],
            }),
        )
        .await
    }

    /// Push a message to a user or group.
    pub async fn push(&self, to: &str, text: &str) -> Result<Option<String>> {
        self.send(
            "/v2/bot/message/push",
            json!({
                "to": to,
                "messages": [{ "type": "text", "text": text }],
            }),
        )
        .await
    }

    async fn send(&self, path: &str, body: serde_json::Value) -> Result<Option<String>> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .timeout(SEND_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("LINE API returned {status}: {detail}"));
        }

        let parsed: SendResponse = response.json().await.unwrap_or(SendResponse {
            sent_messages: Vec::new(),
        });
        Ok(parsed.sent_messages.into_iter().next().map(|m| m.id))
    }
}
