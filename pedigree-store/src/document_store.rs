//! Persistence contract for pedigree documents
//!
//! Key format: `pedigree-tree:v1:{family_id}`
//!
//! Documents are stored as the engine's JSON export and pass back through
//! normalization on load, so older payloads need no migration.

use crate::error::{Result, StoreError};
use crate::feed::{Listener, Subscription, SubscriptionId};
use pedigree_core::{normalize_state, Document};
use serde_json::Value;

pub const KEY_PREFIX: &str = "pedigree-tree:v1:";

pub trait DocumentStore: Send + Sync {
    fn load(&self, family_id: &str) -> Result<Option<Document>>;

    /// Persist `doc` and notify subscribers other than `origin`.
    fn save_from(
        &self,
        family_id: &str,
        doc: &Document,
        origin: Option<SubscriptionId>,
    ) -> Result<()>;

    fn save(&self, family_id: &str, doc: &Document) -> Result<()> {
        self.save_from(family_id, doc, None)
    }

    fn subscribe(&self, family_id: &str, listener: Listener) -> Subscription;

    /// Family ids with a stored document, in key order.
    fn list_families(&self) -> Result<Vec<String>>;

    fn delete(&self, family_id: &str) -> Result<bool>;
}

pub fn storage_key(family_id: &str) -> Result<String> {
    let family_id = family_id.trim();
    if family_id.is_empty() {
        return Err(StoreError::InvalidKey(family_id.to_string()));
    }
    Ok(format!("{}{}", KEY_PREFIX, family_id))
}

pub fn family_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX).filter(|id| !id.is_empty())
}

pub(crate) fn encode(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string(doc)?)
}

pub(crate) fn decode(text: &str) -> Result<Document> {
    let raw: Value = serde_json::from_str(text)?;
    Ok(normalize_state(&raw))
}
