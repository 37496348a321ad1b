//! # Named Locks
//!
//! Serializes protocol runs touching the same multisig or app. Names are
//! acquired in sorted order so two runs over overlapping sets cannot
//! deadlock; the guard releases all of them when dropped, on success,
//! error or cancellation alike. A name's mutex leaves the table once no
//! guard holds it and no run waits on it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

type LockTable = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Per-node table of async mutexes keyed by name.
#[derive(Clone, Default)]
pub struct NamedLocks {
    locks: LockTable,
}

/// Held locks; dropping it releases them.
pub struct LockGuard {
    names: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl LockGuard {
    /// Names held, in acquisition order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.guards.clear();
        for name in &self.names {
            // Only the table's own reference left: nobody holds or awaits it.
            self.table.remove_if(name, |_, mutex| Arc::strong_count(mutex) == 1);
        }
        trace!(names = ?self.names, "[node] locks released");
    }
}

impl NamedLocks {
    /// An empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire every name in `names`, waiting on each in sorted order.
    pub async fn acquire<I, S>(&self, names: I) -> LockGuard
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();

        let mut guards = Vec::with_capacity(names.len());
        for name in &names {
            // The DashMap shard lock is released before awaiting.
            let mutex = self.mutex(name);
            guards.push(mutex.lock_owned().await);
        }
        trace!(names = ?names, "[node] locks acquired");
        LockGuard {
            names,
            guards,
            table: self.locks.clone(),
        }
    }

    /// Whether `name` is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks
            .get(name)
            .map(|m| m.try_lock().is_err())
            .unwrap_or(false)
    }
}
