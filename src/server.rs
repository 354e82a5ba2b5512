use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::dispatch::{Dispatcher, InboundEvent};

/// Domain-ownership verification file, served verbatim at `/<file_name>`.
#[derive(Debug, Clone)]
pub struct VerifierFile {
    pub file_name: String,
    pub content: String,
}

impl VerifierFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Verifier path has no file name: {}", path.display()))?
            .to_string();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read verifier file: {}", path.display()))?;
        Ok(Self { file_name, content })
    }
}

/// Shared application state
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub verifier: Option<VerifierFile>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

fn reply(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (
        status,
        Json(MessageResponse {
            message: message.into(),
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/webhook", get(verify_webhook).post(receive_webhook));

    if let Some(verifier) = &state.verifier {
        app = app.route(&format!("/{}", verifier.file_name), get(serve_verifier));
    }

    app.with_state(state)
}

async fn index() -> &'static str {
    "Hello! The form bot is running."
}

async fn verify_webhook() -> &'static str {
    "Webhook verified."
}

async fn serve_verifier(State(state): State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    state
        .verifier
        .as_ref()
        .map(|v| Html(v.content.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<MessageResponse>) {
    // Anything that isn't a JSON object is handled as an empty payload.
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Default::default()),
    };

    let event = InboundEvent::from_payload(payload);

    match state.dispatcher.handle(event).await {
        Ok(outcome) => {
            info!(
                "Webhook handled: {} {} ({} action(s))",
                outcome.status.as_u16(),
                outcome.message,
                outcome.actions.len()
            );
            reply(outcome.status, outcome.message)
        }
        Err(e) => {
            error!("Webhook failed, upstream unavailable: {:#}", e);
            reply(StatusCode::BAD_GATEWAY, "upstream unavailable")
        }
    }
}
