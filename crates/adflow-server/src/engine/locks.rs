//! Per-key async mutual exclusion.
//!
//! Each campaign id maps to its own `tokio::sync::Mutex`, so operations on the
//! same campaign run one at a time while different campaigns proceed in
//! parallel. Slots are created on demand and dropped once no guard or waiter
//! holds them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<Uuid, Slot>>,
}

/// Held while the caller has exclusive access to `key`.
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: Uuid) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key).or_default().clone()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: Uuid) -> KeyGuard<'_> {
        let guard = self.slot(key).lock_owned().await;
        KeyGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Locks several keys in ascending order so overlapping callers cannot deadlock.
    pub async fn lock_all(&self, keys: &[Uuid]) -> Vec<KeyGuard<'_>> {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys with a live slot.
    #[cfg(test)]
    fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map still references the slot: nobody holds or waits on it.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let key = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(key).await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _first = locks.lock(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(Uuid::new_v4()))
            .await;
        assert!(second.is_ok());
        assert_eq!(locks.active_keys(), 2);
    }

    #[tokio::test]
    async fn test_lock_all_dedups_keys() {
        let locks = KeyedLocks::new();
        let key = Uuid::new_v4();
        let guards = locks.lock_all(&[key, key]).await;
        assert_eq!(guards.len(), 1);
        drop(guards);
        assert_eq!(locks.active_keys(), 0);
    }
}
