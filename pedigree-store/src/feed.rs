//! In-process change notifications for stored documents
//!
//! Listeners subscribe per family. A save can name the subscription that
//! produced it so the writer does not hear its own change echoed back.

use pedigree_core::Document;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::trace;

pub type Listener = Arc<dyn Fn(&Document) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(SubscriptionId, Listener)>>,
}

#[derive(Clone, Default)]
pub struct ChangeFeed {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, family_id: &str, listener: Listener) -> Subscription {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .listeners
            .entry(family_id.to_string())
            .or_default()
            .push((id, listener));
        trace!(family = %family_id, subscription = id.0, "subscribe");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            family_id: family_id.to_string(),
            id,
        }
    }

    /// Notify every listener of `family_id` except `origin`.
    pub fn publish(&self, family_id: &str, doc: &Document, origin: Option<SubscriptionId>) {
        // Listeners run outside the lock so they may subscribe or unsubscribe.
        let targets: Vec<Listener> = {
            let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry
                .listeners
                .get(family_id)
                .into_iter()
                .flatten()
                .filter(|(id, _)| Some(*id) != origin)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        trace!(family = %family_id, listeners = targets.len(), "publish");
        for listener in targets {
            listener(doc);
        }
    }

    pub fn listener_count(&self, family_id: &str) -> usize {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.get(family_id).map_or(0, Vec::len)
    }
}

/// Guard for one listener; dropping it unsubscribes.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    family_id: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(listeners) = registry.listeners.get_mut(&self.family_id) {
            listeners.retain(|(id, _)| *id != self.id);
            if listeners.is_empty() {
                registry.listeners.remove(&self.family_id);
            }
        }
        trace!(family = %self.family_id, subscription = self.id.0, "unsubscribe");
    }
}
