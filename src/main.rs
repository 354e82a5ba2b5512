mod config;
mod dispatch;
mod forms;
mod platform;
mod server;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StoreBackend};
use crate::dispatch::Dispatcher;
use crate::forms::FormCatalog;
use crate::platform::zalo::ZaloClient;
use crate::server::{AppState, VerifierFile};
use crate::store::sheets::SheetsStore;
use crate::store::sqlite::SqliteStore;
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,formbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Secrets may come from a .env file; a missing file is fine.
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from: {}", path.display());
    }

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Store backend: {}", config.store.backend);
    info!("  Zalo API: {}", config.zalo.api_base_url);
    let catalog = FormCatalog::new(config.forms.clone());
    info!("  Forms in catalog: {}", catalog.len());
    if catalog.is_empty() {
        warn!("Form catalog is empty; only personal form links will be sent");
    }

    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Sheets => {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.store.sheets.request_timeout_secs))
                .build()
                .context("Failed to build Sheets HTTP client")?;
            info!("  Spreadsheet: {}", config.store.sheets.spreadsheet_id);
            Arc::new(SheetsStore::from_config(client, &config.store.sheets)?)
        }
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.store.sqlite.database_path)?),
    };
    let gateway = Arc::new(ZaloClient::new(&config.zalo)?);

    let verifier = config
        .server
        .verifier_file
        .as_deref()
        .map(VerifierFile::load)
        .transpose()?;
    if let Some(v) = &verifier {
        info!("  Serving verifier file at /{}", v.file_name);
    }

    let dispatcher = Dispatcher::new(
        store,
        gateway,
        catalog,
        config.messages.clone(),
    );
    let state = Arc::new(AppState {
        dispatcher,
        verifier,
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!("Webhook server listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
