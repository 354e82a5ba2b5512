//! Webhook event dispatch: decides which contact to create, whether the
//! sender may receive a form, and which document URL to send back.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::MessagesConfig;
use crate::forms::{FormCatalog, FormId};
use crate::platform::MessagingGateway;
use crate::store::{Contact, RecordStore};

const FILE_TYPE: &str = "pdf";

/// A webhook payload, classified by `event_name`.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Follow {
        user_id: Option<String>,
    },
    MessageReceived {
        user_id: Option<String>,
        form_id: Option<String>,
    },
    Unknown {
        event_name: Option<String>,
        payload: Value,
    },
}

/// Render an id field as a string. Numbers keep their decimal form; blanks are absent.
fn id_string(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(raw).filter(|s| !s.is_empty())
}

fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl InboundEvent {
    pub fn from_payload(payload: Value) -> Self {
        let event_name = payload
            .get("event_name")
            .and_then(Value::as_str)
            .map(str::to_string);

        match event_name.as_deref() {
            Some("follow") => InboundEvent::Follow {
                user_id: id_string(payload.get("user_id"))
                    .or_else(|| id_string(payload.pointer("/follower/id"))),
            },
            Some("user_send_message") => InboundEvent::MessageReceived {
                user_id: id_string(payload.pointer("/sender/id")),
                form_id: text_field(payload.get("form_type"))
                    .or_else(|| text_field(payload.pointer("/message/text"))),
            },
            _ => InboundEvent::Unknown {
                event_name,
                payload,
            },
        }
    }
}

/// A side effect the dispatcher carried out while handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AppendContact { user_id: String },
    SendText { user_id: String, text: String },
    SendFile { user_id: String, url: String },
}

/// What to answer the webhook caller with, plus the actions taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub message: String,
    pub actions: Vec<Action>,
}

impl Outcome {
    fn new(status: StatusCode, message: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            status,
            message: message.into(),
            actions,
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn MessagingGateway>,
    catalog: FormCatalog,
    messages: MessagesConfig,
    /// Serializes the check-then-append of follow events within this process.
    follow_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn MessagingGateway>,
        catalog: FormCatalog,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
            messages,
            follow_lock: Mutex::new(()),
        }
    }

    /// Handle one event. Errors mean the record store could not be reached.
    pub async fn handle(&self, event: InboundEvent) -> Result<Outcome> {
        match event {
            InboundEvent::Follow { user_id } => self.handle_follow(user_id).await,
            InboundEvent::MessageReceived { user_id, form_id } => {
                self.handle_message(user_id, form_id).await
            }
            InboundEvent::Unknown {
                event_name,
                payload,
            } => {
                debug!("Ignoring unknown event {:?}: {}", event_name, payload);
                Ok(Outcome::new(StatusCode::BAD_REQUEST, "unknown event", Vec::new()))
            }
        }
    }

    async fn handle_follow(&self, user_id: Option<String>) -> Result<Outcome> {
        let mut actions = Vec::new();
        let Some(user_id) = user_id else {
            debug!("Follow event without a user id");
            return Ok(Outcome::new(StatusCode::OK, "follow handled", actions));
        };

        let _guard = self.follow_lock.lock().await;

        let existing = self
            .store
            .find(&user_id)
            .await
            .context("Failed to look up contact")?;

        if existing.is_none() {
            let contact = Contact::new(&user_id, &self.messages.default_display_name);
            self.store
                .append(&contact)
                .await
                .context("Failed to append contact")?;
            info!("New follower {} added to contacts", user_id);
            actions.push(Action::AppendContact {
                user_id: user_id.clone(),
            });

            self.send_text(&user_id, &self.messages.welcome, &mut actions)
                .await;
        } else {
            debug!("Follower {} already known", user_id);
        }

        Ok(Outcome::new(StatusCode::OK, "follow handled", actions))
    }

    async fn handle_message(
        &self,
        user_id: Option<String>,
        form_id: Option<String>,
    ) -> Result<Outcome> {
        let mut actions = Vec::new();

        let Some(user_id) = user_id else {
            debug!("Message event without a sender id");
            return Ok(Outcome::new(StatusCode::FORBIDDEN, "not a follower", actions));
        };
        if !self.gateway.is_follower(&user_id).await {
            info!("Form request from non-follower {}", user_id);
            self.send_text(&user_id, &self.messages.follow_required, &mut actions)
                .await;
            return Ok(Outcome::new(StatusCode::FORBIDDEN, "not a follower", actions));
        }

        let url = self.resolve_form_url(&user_id, form_id.as_deref()).await?;

        match (url, form_id) {
            (Some(url), Some(form_id)) => {
                info!("Sending {} to {}", form_id, user_id);
                self.send_file(&user_id, &url, &mut actions).await;
                Ok(Outcome::new(
                    StatusCode::OK,
                    format!("sent {form_id}"),
                    actions,
                ))
            }
            (_, form_id) => {
                info!("No form {:?} available for {}", form_id, user_id);
                self.send_text(&user_id, &self.messages.form_unavailable, &mut actions)
                    .await;
                Ok(Outcome::new(StatusCode::NOT_FOUND, "form not found", actions))
            }
        }
    }

    /// Per-contact override first, then the catalog.
    async fn resolve_form_url(&self, user_id: &str, form_id: Option<&str>) -> Result<Option<String>> {
        let Some(form_id) = form_id else {
            return Ok(None);
        };

        if let Some(column) = FormId::parse(form_id) {
            let contact = self
                .store
                .find(user_id)
                .await
                .context("Failed to look up contact")?;
            if let Some(url) = contact.as_ref().and_then(|c| column.override_url(c)) {
                debug!("Using personal {} link for {}", column, user_id);
                return Ok(Some(url.to_string()));
            }
        }

        Ok(self.catalog.get(form_id).map(str::to_string))
    }

    // Sends are fire-and-forget: a failed delivery is logged and the response stands.
    async fn send_text(&self, user_id: &str, text: &str, actions: &mut Vec<Action>) {
        if let Err(e) = self.gateway.send_text(user_id, text).await {
            warn!("Failed to send text to {}: {:#}", user_id, e);
        }
        actions.push(Action::SendText {
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
    }

    async fn send_file(&self, user_id: &str, url: &str, actions: &mut Vec<Action>) {
        if let Err(e) = self.gateway.send_file(user_id, url, FILE_TYPE).await {
            warn!("Failed to send file to {}: {:#}", user_id, e);
        }
        actions.push(Action::SendFile {
            user_id: user_id.to_string(),
            url: url.to_string(),
        });
    }
}
