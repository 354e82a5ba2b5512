use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sheets,
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sheets => write!(f, "sheets"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    pub zalo: ZaloConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_forms")]
    pub forms: BTreeMap<String, String>,
    #[serde(default = "default_messages_config")]
    pub messages: MessagesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Domain-ownership verification file served at `/<file name>`.
    #[serde(default)]
    pub verifier_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZaloConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_zalo_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    /// Tab holding the contacts; blank means the first tab.
    #[serde(default)]
    pub worksheet: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Pre-issued OAuth token; when set the service-account key is not read.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_sheets_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub columns: SheetColumns,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            worksheet: String::new(),
            credentials_path: default_credentials_path(),
            access_token: None,
            api_base_url: default_sheets_base_url(),
            request_timeout_secs: default_timeout_secs(),
            columns: SheetColumns::default(),
        }
    }
}

/// Header names used to locate contact fields in the worksheet.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SheetColumns {
    pub name: String,
    pub user_id: String,
    pub form_1: String,
    pub form_2: String,
    pub form_3: String,
}

impl Default for SheetColumns {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            user_id: "user_id_zalo".to_string(),
            form_1: "form_1_url".to_string(),
            form_2: "form_2_url".to_string(),
            form_3: "form_3_url".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
        }
    }
}

/// User-facing texts and the name given to newly created contacts.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MessagesConfig {
    #[serde(default = "default_welcome")]
    pub welcome: String,
    #[serde(default = "default_follow_required")]
    pub follow_required: String,
    #[serde(default = "default_form_unavailable")]
    pub form_unavailable: String,
    #[serde(default = "default_display_name")]
    pub default_display_name: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_zalo_base_url() -> String {
    "https://openapi.zalo.me".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("creds.json")
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("contacts.db")
}

fn default_welcome() -> String {
    "Thanks for following! Pick a form to receive your document.".to_string()
}

fn default_follow_required() -> String {
    "Please follow the OA to receive forms!".to_string()
}

fn default_form_unavailable() -> String {
    "This form is not available yet, please try again later.".to_string()
}

fn default_display_name() -> String {
    "unknown".to_string()
}

pub fn default_forms() -> BTreeMap<String, String> {
    [
        (
            "form_1",
            "https://drive.google.com/file/d/1nPd0Zs50fEzKLjJMEOUFjXPfwOxPWROf/uc?export=download",
        ),
        (
            "form_2",
            "https://drive.google.com/file/d/1jveCG0pcRQt4vuFVOekUYwAz5jQ9C3vY/uc?export=download",
        ),
        (
            "form_3",
            "https://drive.google.com/file/d/124zgnEeb0nU-DfQzcqh27MWtKS-WuF3D/uc?export=download",
        ),
    ]
    .into_iter()
    .map(|(id, url)| (id.to_string(), url.to_string()))
    .collect()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
        verifier_file: None,
    }
}

pub fn default_messages_config() -> MessagesConfig {
    MessagesConfig {
        welcome: default_welcome(),
        follow_required: default_follow_required(),
        form_unavailable: default_form_unavailable(),
        default_display_name: default_display_name(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Secrets may live in the environment (or a `.env` file) instead of the config file.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("ZALO_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.zalo.access_token = token;
        }
        if let Some(sheet_id) = lookup("GOOGLE_SHEET_ID").filter(|v| !v.is_empty()) {
            self.store.sheets.spreadsheet_id = sheet_id;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.zalo.access_token.trim().is_empty() {
            anyhow::bail!("zalo.access_token is empty (set it in the config or ZALO_ACCESS_TOKEN)");
        }
        if self.store.backend == StoreBackend::Sheets
            && self.store.sheets.spreadsheet_id.trim().is_empty()
        {
            anyhow::bail!(
                "store.sheets.spreadsheet_id is empty (set it in the config or GOOGLE_SHEET_ID)"
            );
        }
        Ok(())
    }
}
