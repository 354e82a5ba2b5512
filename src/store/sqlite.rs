use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{non_empty, Contact, RecordStore};

/// Contact store backed by a local SQLite file.
///
/// `external_user_id` is the primary key, so lookups are keyed and a
/// duplicate append is a no-op even when two follows race.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Contact store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contacts (
                external_user_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                form_1_url TEXT,
                form_2_url TEXT,
                form_3_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .context("Failed to create contacts table")?;
        Ok(())
    }

    fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
        Ok(Contact {
            external_user_id: row.get(0)?,
            display_name: row.get(1)?,
            form_1_url: non_empty(row.get(2)?),
            form_2_url: non_empty(row.get(3)?),
            form_3_url: non_empty(row.get(4)?),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<Contact>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT external_user_id, display_name, form_1_url, form_2_url, form_3_url
             FROM contacts ORDER BY rowid",
        )?;
        let contacts = stmt
            .query_map([], Self::row_to_contact)
            .context("Failed to map rows")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to collect rows")?;
        Ok(contacts)
    }

    async fn append(&self, contact: &Contact) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO contacts
             (external_user_id, display_name, form_1_url, form_2_url, form_3_url)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(external_user_id) DO NOTHING",
            rusqlite::params![
                contact.external_user_id.trim(),
                contact.display_name,
                contact.form_1_url,
                contact.form_2_url,
                contact.form_3_url,
            ],
        )
        .context("Failed to insert contact")?;
        Ok(())
    }

    async fn find(&self, user_id: &str) -> Result<Option<Contact>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT external_user_id, display_name, form_1_url, form_2_url, form_3_url
             FROM contacts WHERE external_user_id = ?1",
            rusqlite::params![user_id.trim()],
            Self::row_to_contact,
        )
        .optional()
        .context("Failed to look up contact")
    }
}
