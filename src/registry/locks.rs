//! Per-group mutual exclusion.
//!
//! # Responsibilities
//! - Map each group key to its own async mutex, created on first use
//! - Serialize record mutation, regeneration and reload for one group
//! - Never block work on unrelated groups
//!
//! # Design Decisions
//! - `tokio::sync::Mutex` queues waiters FIFO, so a hot group cannot starve a waiter
//! - The table hands out owned guards; a task holds at most one group lock

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::registry::types::GroupKey;

/// Lazily populated table of per-group locks.
#[derive(Debug, Default)]
pub struct GroupLockTable {
    locks: DashMap<GroupKey, Arc<Mutex<()>>>,
}

impl GroupLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, group: &GroupKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(group) {
            return Arc::clone(lock.value());
        }
        self.locks
            .entry(group.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait for exclusive access to a group.
    pub async fn acquire(&self, group: &GroupKey) -> OwnedMutexGuard<()> {
        // The map shard guard is released before awaiting.
        let lock = self.handle(group);
        lock.lock_owned().await
    }

    /// Run `f` while holding the group's lock.
    pub async fn with_group_lock<F, Fut, T>(&self, group: &GroupKey, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(group).await;
        f().await
    }

    /// Number of groups that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_locks_created_lazily() {
        let table = GroupLockTable::new();
        assert!(table.is_empty());

        table.with_group_lock(&GroupKey::new("a"), || async {}).await;
        table.with_group_lock(&GroupKey::new("a"), || async {}).await;
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_same_group_serializes() {
        let table = Arc::new(GroupLockTable::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                table
                    .with_group_lock(&GroupKey::new("hot"), || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_group_not_blocked() {
        let table = GroupLockTable::new();
        let _held = table.acquire(&GroupKey::new("a")).await;

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            table.acquire(&GroupKey::new("b")),
        )
        .await;
        assert!(result.is_ok(), "lock on group a must not delay group b");

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            table.acquire(&GroupKey::new("a")),
        )
        .await;
        assert!(blocked.is_err());
    }
}
