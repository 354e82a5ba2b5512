pub mod sheets;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

/// A follower of the OA, with optional personalized form links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub display_name: String,
    pub external_user_id: String,
    pub form_1_url: Option<String>,
    pub form_2_url: Option<String>,
    pub form_3_url: Option<String>,
}

impl Contact {
    /// A fresh contact with no form overrides.
    pub fn new(external_user_id: &str, display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            external_user_id: external_user_id.to_string(),
            form_1_url: None,
            form_2_url: None,
            form_3_url: None,
        }
    }

    pub fn matches(&self, user_id: &str) -> bool {
        self.external_user_id.trim() == user_id.trim()
    }
}

/// Where contacts live. Backends only need `list_all` and `append`;
/// `find` defaults to a linear scan and may be overridden with a keyed lookup.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Contact>>;

    async fn append(&self, contact: &Contact) -> Result<()>;

    async fn find(&self, user_id: &str) -> Result<Option<Contact>> {
        // O(n) per call; fine for a sheet-sized contact list.
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|c| c.matches(user_id)))
    }
}

/// Treat empty or whitespace-only cells as missing.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
