//! Process-wide collection locks.
//!
//! `cargo test` runs tests concurrently. Fixture groups that target the same
//! collection on the same store must not interleave, so each group holds the
//! collection's lock from setup through teardown.
//!
//! The registry holds weak references: a lock lives only while a guard or a
//! waiter holds it, and dead entries are pruned on every acquisition.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::StoreAddress;

type Registry = HashMap<String, Weak<AsyncMutex<()>>>;

static COLLECTION_LOCKS: LazyLock<Mutex<Registry>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Wait for exclusive access to `collection` on `address`.
pub(crate) async fn lock_collection(address: &StoreAddress, collection: &str) -> OwnedMutexGuard<()> {
    let key = format!("{address}#{collection}");
    let lock = {
        // A poisoned registry still holds valid locks.
        let mut registry = COLLECTION_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
        registry.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = registry.get(&key).and_then(Weak::upgrade) {
            lock
        } else {
            let lock = Arc::new(AsyncMutex::new(()));
            registry.insert(key, Arc::downgrade(&lock));
            lock
        }
    };
    lock.lock_owned().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_collection_is_exclusive() {
        let address: StoreAddress = "locks-test:1/db".parse().unwrap();
        let guard = lock_collection(&address, "users").await;

        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            lock_collection(&address, "users"),
        )
        .await;
        assert!(pending.is_err(), "second lock should wait");

        drop(guard);
        let _again = lock_collection(&address, "users").await;
    }

    fn registered(key: &str) -> bool {
        COLLECTION_LOCKS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let address: StoreAddress = "locks-test:3/db".parse().unwrap();
        let key = format!("{address}#users");

        let guard = lock_collection(&address, "users").await;
        assert!(registered(&key));
        drop(guard);

        let _other = lock_collection(&address, "orders").await;
        assert!(!registered(&key), "unused lock should be pruned");
    }

    #[tokio::test]
    async fn test_different_collections_do_not_block() {
        let address: StoreAddress = "locks-test:2/db".parse().unwrap();
        let _users = lock_collection(&address, "users").await;
        let _orders = tokio::time::timeout(
            Duration::from_millis(20),
            lock_collection(&address, "orders"),
        )
        .await
        .expect("independent collection should not wait");
    }
}
