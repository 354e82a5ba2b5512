pub mod zalo;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

/// Result of a follower lookup against the OA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FollowerStatus {
    pub success: bool,
    pub is_follower: bool,
}

/// Recipient-addressed message as posted to the OA message endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub message: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text { text: String },
    Attachment { attachment: Attachment },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: FilePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePayload {
    pub file_type: String,
    pub url: String,
}

impl OutboundMessage {
    pub fn text(user_id: &str, text: &str) -> Self {
        Self {
            recipient: Recipient {
                user_id: user_id.to_string(),
            },
            message: MessageBody::Text {
                text: text.to_string(),
            },
        }
    }

    pub fn file(user_id: &str, url: &str, file_type: &str) -> Self {
        Self {
            recipient: Recipient {
                user_id: user_id.to_string(),
            },
            message: MessageBody::Attachment {
                attachment: Attachment {
                    kind: "file".to_string(),
                    payload: FilePayload {
                        file_type: file_type.to_string(),
                        url: url.to_string(),
                    },
                },
            },
        }
    }
}

/// The chat platform the OA lives on.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn follower_status(&self, user_id: &str) -> Result<FollowerStatus>;

    async fn post_message(&self, message: &OutboundMessage) -> Result<()>;

    /// Fail-closed follower check: lookup errors and unsuccessful responses count as "no".
    async fn is_follower(&self, user_id: &str) -> bool {
        if user_id.trim().is_empty() {
            return false;
        }
        match self.follower_status(user_id).await {
            Ok(status) => status.success && status.is_follower,
            Err(e) => {
                warn!("Follower lookup failed for {}: {:#}", user_id, e);
                false
            }
        }
    }

    async fn send_text(&self, user_id: &str, text: &str) -> Result<()> {
        self.post_message(&OutboundMessage::text(user_id, text)).await
    }

    async fn send_file(&self, user_id: &str, url: &str, file_type: &str) -> Result<()> {
        self.post_message(&OutboundMessage::file(user_id, url, file_type))
            .await
    }
}
