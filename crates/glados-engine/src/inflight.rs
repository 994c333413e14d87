use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async lock table keyed by cache filename
///
/// Holders of the same key run one after another; different keys never
/// contend. Entries are dropped once nobody holds or waits on them.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive hold on one key, released on drop
#[derive(Debug)]
pub struct KeyGuard {
    table: Arc<KeyedLocks>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it
    pub async fn lock(self: &Arc<Self>, key: &str) -> KeyGuard {
        let mutex = Arc::clone(&self.locks.entry(key.to_string()).or_default());
        let guard = mutex.lock_owned().await;

        KeyGuard {
            table: Arc::clone(self),
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
impl KeyGuard {
    fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // only the table's own handle left
        self.table
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = locks.lock("a.wav").await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = Arc::new(KeyedLocks::new());
        let first = locks.lock("a.wav").await;

        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock("b.wav"))
            .await
            .expect("independent key must not wait");

        assert_eq!(locks.len(), 2);
        assert_eq!(second.key(), "b.wav");
        drop(first);
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_kept_while_waiter_pending() {
        let locks = Arc::new(KeyedLocks::new());
        let held = locks.lock("a.wav").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.lock("a.wav").await.key().to_string() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(waiter.await.unwrap(), "a.wav");
        assert!(locks.is_empty());
    }
}
