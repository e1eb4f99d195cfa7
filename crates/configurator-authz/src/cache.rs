//! Decision caches.
//!
//! Pure memoization scoped to one service instance: no TTL, entries only
//! disappear through [`DecisionCache::clear`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

/// Key of a cached permission decision.
pub type PermissionKey = (i64, String, String);

/// Key of a cached privilege decision.
pub type PrivilegeKey = (i64, String, Option<i64>);

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached permission decisions
    pub permission_entries: usize,
    /// Cached accessible-customer sets
    pub customer_entries: usize,
    /// Cached privilege decisions
    pub privilege_entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
}

/// Memoized permission, accessible-customer and privilege results.
#[derive(Debug, Default)]
pub struct DecisionCache {
    permissions: RwLock<HashMap<PermissionKey, bool>>,
    customers: RwLock<HashMap<i64, Vec<i64>>>,
    privileges: RwLock<HashMap<PrivilegeKey, bool>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DecisionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn count<T>(&self, found: Option<T>) -> Option<T> {
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Cached permission decision.
    pub async fn permission(&self, key: &PermissionKey) -> Option<bool> {
        let found = self.permissions.read().await.get(key).copied();
        self.count(found)
    }

    /// Store a permission decision.
    pub async fn store_permission(&self, key: PermissionKey, allowed: bool) {
        self.permissions.write().await.insert(key, allowed);
    }

    /// Cached accessible customers of a user.
    pub async fn customers(&self, user_id: i64) -> Option<Vec<i64>> {
        let found = self.customers.read().await.get(&user_id).cloned();
        self.count(found)
    }

    /// Store the accessible customers of a user.
    pub async fn store_customers(&self, user_id: i64, customer_ids: Vec<i64>) {
        self.customers.write().await.insert(user_id, customer_ids);
    }

    /// Forget the accessible customers of a user.
    pub async fn forget_customers(&self, user_id: i64) {
        self.customers.write().await.remove(&user_id);
    }

    /// Cached privilege decision.
    pub async fn privilege(&self, key: &PrivilegeKey) -> Option<bool> {
        let found = self.privileges.read().await.get(key).copied();
        self.count(found)
    }

    /// Store a privilege decision.
    pub async fn store_privilege(&self, key: PrivilegeKey, allowed: bool) {
        self.privileges.write().await.insert(key, allowed);
    }

    /// Drop every cached result.
    pub async fn clear(&self) {
        self.permissions.write().await.clear();
        self.customers.write().await.clear();
        self.privileges.write().await.clear();
    }

    /// Current statistics.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            permission_entries: self.permissions.read().await.len(),
            customer_entries: self.customers.read().await.len(),
            privilege_entries: self.privileges.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
