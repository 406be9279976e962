//! ReDB-based document storage
//!
//! Key format: `pedigree-tree:v1:{family_id}`, value is the JSON export.

use crate::document_store::{
    decode, encode, family_id_from_key, storage_key, DocumentStore, KEY_PREFIX,
};
use crate::error::Result;
use crate::feed::{ChangeFeed, Listener, Subscription, SubscriptionId};
use pedigree_core::Document;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use tracing::debug;

const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// ReDB-backed document store
pub struct RedbStore {
    db: Database,
    feed: ChangeFeed,
}

#[allow(clippy::result_large_err)]
impl RedbStore {
    /// Open the store (create if not exists)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            feed: ChangeFeed::new(),
        })
    }
}

#[allow(clippy::result_large_err)]
impl DocumentStore for RedbStore {
    fn load(&self, family_id: &str) -> Result<Option<Document>> {
        let key = storage_key(family_id)?;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        match table.get(key.as_str())? {
            Some(value) => {
                let text = String::from_utf8_lossy(value.value()).into_owned();
                decode(&text).map(Some)
            }
            None => Ok(None),
        }
    }

    fn save_from(
        &self,
        family_id: &str,
        doc: &Document,
        origin: Option<SubscriptionId>,
    ) -> Result<()> {
        let key = storage_key(family_id)?;
        let value = encode(doc)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            table.insert(key.as_str(), value.as_bytes())?;
        }
        write_txn.commit()?;
        debug!(family = %family_id, bytes = value.len(), "saved document to redb");

        self.feed.publish(family_id.trim(), doc, origin);
        Ok(())
    }

    fn subscribe(&self, family_id: &str, listener: Listener) -> Subscription {
        self.feed.subscribe(family_id.trim(), listener)
    }

    fn list_families(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;

        let mut families = Vec::new();
        for entry in table.range::<&str>(KEY_PREFIX..)? {
            let (key, _) = entry?;
            match family_id_from_key(key.value()) {
                Some(id) => families.push(id.to_string()),
                None if !key.value().starts_with(KEY_PREFIX) => break,
                None => {}
            }
        }
        Ok(families)
    }

    fn delete(&self, family_id: &str) -> Result<bool> {
        let key = storage_key(family_id)?;
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            table.remove(key.as_str())?.is_some()
        };
        write_txn.commit()?;
        debug!(family = %family_id, removed, "deleted document from redb");
        Ok(removed)
    }
}
