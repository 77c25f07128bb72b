//! Identifier-keyed subscription registry.
//!
//! Every structural change takes the write lock; lookups take the read lock.
//! A rekey is therefore observed either entirely before or entirely after by
//! concurrent lookups.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::subscription::Subscription;

type Entries = HashMap<String, Arc<Subscription>>;

/// Subscriptions of one listener, keyed by their current identifier.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weak back-channel handed to subscriptions
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Register a subscription under its current identifier.
    ///
    /// Returns the subscription previously held under that identifier.
    pub async fn insert(&self, subscription: Arc<Subscription>) -> Option<Arc<Subscription>> {
        let mut entries = self.entries.write().await;
        let id = subscription.id().await;
        debug!(id = %id, "Registering subscription");
        entries.insert(id, subscription)
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<Subscription>> {
        self.entries.write().await.remove(id)
    }

    pub async fn lookup(&self, id: &str) -> Option<Arc<Subscription>> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Move the entry under `old` to `new`, updating the subscription's own id.
    ///
    /// Returns false, changing nothing, when `old` is not registered.
    pub async fn rekey(&self, old: &str, new: &str) -> bool {
        rekey_entries(&self.entries, old, new).await
    }

    /// All registered subscriptions at this instant
    pub async fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Narrow, non-owning view of a registry.
///
/// Subscriptions hold this instead of the registry itself, so the registry
/// owning its subscriptions does not form a cycle.
#[derive(Clone, Default)]
pub struct RegistryHandle {
    entries: Weak<RwLock<Entries>>,
}

impl RegistryHandle {
    /// A handle not attached to any registry
    pub fn detached() -> Self {
        Self::default()
    }

    pub(crate) async fn rekey(&self, old: &str, new: &str) -> bool {
        match self.entries.upgrade() {
            Some(entries) => rekey_entries(&entries, old, new).await,
            None => false,
        }
    }

    pub(crate) async fn drop_entry(&self, id: &str) -> bool {
        match self.entries.upgrade() {
            Some(entries) => entries.write().await.remove(id).is_some(),
            None => false,
        }
    }
}

async fn rekey_entries(entries: &RwLock<Entries>, old: &str, new: &str) -> bool {
    let mut entries = entries.write().await;
    if old == new {
        return entries.contains_key(old);
    }

    let Some(subscription) = entries.remove(old) else {
        return false;
    };

    subscription.set_id(new.to_string()).await;
    if entries.insert(new.to_string(), subscription).is_some() {
        warn!(id = %new, "Rekey replaced an existing subscription");
    }
    debug!(from = %old, to = %new, "Rekeyed subscription");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{subscription, FakePlatform};
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_lookup_remove() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription(FakePlatform::new(), &registry);
        let id = sub.id().await;

        assert!(registry.insert(sub.clone()).await.is_none());
        assert_eq!(registry.len().await, 1);
        assert!(registry.contains(&id).await);
        assert!(Arc::ptr_eq(&registry.lookup(&id).await.unwrap(), &sub));
        assert_eq!(registry.ids().await, vec![id.clone()]);

        assert!(registry.remove(&id).await.is_some());
        assert!(registry.lookup(&id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_rekey() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription(FakePlatform::new(), &registry);
        let old = sub.id().await;
        registry.insert(sub.clone()).await;

        assert!(registry.rekey(&old, "new-id").await);
        assert!(registry.lookup(&old).await.is_none());
        assert!(Arc::ptr_eq(&registry.lookup("new-id").await.unwrap(), &sub));
        assert_eq!(sub.id().await, "new-id");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_rekey_missing_is_noop() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription(FakePlatform::new(), &registry);
        let id = sub.id().await;
        registry.insert(sub.clone()).await;

        assert!(!registry.rekey("missing", "other").await);
        assert_eq!(registry.ids().await, vec![id.clone()]);
        assert!(registry.rekey(&id, &id).await);
        assert_eq!(sub.id().await, id);
    }

    #[tokio::test]
    async fn test_handle_follows_registry() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription(FakePlatform::new(), &registry);
        let id = sub.id().await;
        registry.insert(sub).await;

        let handle = registry.handle();
        assert!(handle.rekey(&id, "moved").await);
        assert!(registry.contains("moved").await);
        assert!(handle.drop_entry("moved").await);
        assert!(!handle.drop_entry("moved").await);
        assert!(registry.is_empty().await);

        drop(registry);
        assert!(!handle.rekey("a", "b").await);
        assert!(!RegistryHandle::detached().drop_entry("a").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rekey_is_atomic_under_concurrent_lookups() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription(FakePlatform::new(), &registry);
        let old = sub.id().await;
        registry.insert(sub).await;

        let mut readers = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            let old = old.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let entries = registry.entries.read().await;
                    let visible =
                        entries.contains_key(&old) as usize + entries.contains_key("new") as usize;
                    assert_eq!(visible, 1, "entry must be reachable under exactly one key");
                    drop(entries);
                    tokio::task::yield_now().await;
                }
            }));
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(registry.rekey(&old, "new").await);

        for reader in readers {
            reader.await.unwrap();
        }
        assert!(registry.contains("new").await);
    }
}
