//! SQLite-based document storage
//!
//! Schema:
//!   - documents: one row per family (storage key, JSON text, save time)

use crate::document_store::{decode, encode, family_id_from_key, storage_key, DocumentStore};
use crate::error::{Result, StoreError};
use crate::feed::{ChangeFeed, Listener, Subscription, SubscriptionId};
use pedigree_core::Document;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed document store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

#[allow(clippy::result_large_err)]
impl SqliteStore {
    /// Open the store (create if not exists). `":memory:"` opens a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        if path != Path::new(":memory:") {
            // WAL mode for read-write concurrency
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                key TEXT NOT NULL PRIMARY KEY,
                value TEXT NOT NULL,
                saved_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[allow(clippy::result_large_err)]
impl DocumentStore for SqliteStore {
    fn load(&self, family_id: &str) -> Result<Option<Document>> {
        let key = storage_key(family_id)?;
        let text: Option<String> = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT value FROM documents WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?
        };

        text.as_deref().map(decode).transpose()
    }

    fn save_from(
        &self,
        family_id: &str,
        doc: &Document,
        origin: Option<SubscriptionId>,
    ) -> Result<()> {
        let key = storage_key(family_id)?;
        let value = encode(doc)?;
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR REPLACE INTO documents (key, value, saved_at)
                 VALUES (?, ?, strftime('%s', 'now'))",
                params![key, value],
            )?;
        }
        debug!(family = %family_id, bytes = value.len(), "saved document to sqlite");

        self.feed.publish(family_id.trim(), doc, origin);
        Ok(())
    }

    fn subscribe(&self, family_id: &str, listener: Listener) -> Subscription {
        self.feed.subscribe(family_id.trim(), listener)
    }

    fn list_families(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM documents ORDER BY key")?;
        let keys = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut families = Vec::new();
        for key in keys {
            if let Some(id) = family_id_from_key(&key?) {
                families.push(id.to_string());
            }
        }
        Ok(families)
    }

    fn delete(&self, family_id: &str) -> Result<bool> {
        let key = storage_key(family_id)?;
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM documents WHERE key = ?", params![key])?;
        debug!(family = %family_id, removed, "deleted document from sqlite");
        Ok(removed > 0)
    }
}
