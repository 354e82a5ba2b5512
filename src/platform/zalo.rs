use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{FollowerStatus, MessagingGateway, OutboundMessage};
use crate::config::ZaloConfig;

/// Zalo OA open API client
pub struct ZaloClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ZaloClient {
    pub fn new(config: &ZaloConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build Zalo HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }
}

/// Zalo reports API failures in the body as a non-zero `error` code.
fn api_error(body: &Value) -> Option<(i64, String)> {
    let code = body.get("error").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return None;
    }
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

/// Interpret a `getuser` response. `is_follower` may be `1` or `true`.
fn parse_follower_status(body: &Value) -> FollowerStatus {
    let success = api_error(body).is_none();
    let is_follower = match body.pointer("/data/is_follower") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    };
    FollowerStatus {
        success,
        is_follower,
    }
}

#[async_trait]
impl MessagingGateway for ZaloClient {
    async fn follower_status(&self, user_id: &str) -> Result<FollowerStatus> {
        let url = format!("{}/v2.0/oa/getuser", self.base_url);

        debug!("Looking up follower status for {}", user_id);

        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .header("access_token", &self.access_token)
            .send()
            .await
            .context("Failed to send request to Zalo")?;

        if !response.status().is_success() {
            debug!("Zalo getuser returned {}", response.status());
            return Ok(FollowerStatus::default());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Zalo getuser response")?;

        Ok(parse_follower_status(&body))
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<()> {
        let url = format!("{}/v3.0/oa/message", self.base_url);

        debug!("Posting message to {}", message.recipient.user_id);

        let response = self
            .client
            .post(&url)
            .header("access_token", &self.access_token)
            .json(message)
            .send()
            .await
            .context("Failed to send message to Zalo")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Zalo API error ({}): {}", status, error_body);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if let Some((code, msg)) = api_error(&body) {
            anyhow::bail!("Zalo API error {}: {}", code, msg);
        }
        Ok(())
    }
}
