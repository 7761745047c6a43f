//! Per-key async mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per key.
///
/// Entries nobody holds or waits on are pruned on the next acquisition, so
/// the map only grows with the number of keys in flight.
pub struct KeyedLock<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until the lock for `key` is free and returns its guard.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
