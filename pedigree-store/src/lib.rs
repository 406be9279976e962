pub mod document_store;
pub mod error;
pub mod feed;
pub mod redb_store;
pub mod sqlite_store;

pub use document_store::{family_id_from_key, storage_key, DocumentStore, KEY_PREFIX};
pub use error::{Result, StoreError};
pub use feed::{ChangeFeed, Listener, Subscription, SubscriptionId};
pub use redb_store::RedbStore;
pub use sqlite_store::SqliteStore;
