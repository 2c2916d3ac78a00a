//! Keyed exclusive locks.
//!
//! A task acquires a whole set of keys at once or waits; it never holds a
//! partial set, so two tasks contending for overlapping sets cannot
//! deadlock. Used for merge team ids, create-new club keys and review ids.

use std::{
  collections::HashSet,
  hash::Hash,
  sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;

#[derive(Debug)]
pub struct LockTable<K> {
  held:     Mutex<HashSet<K>>,
  released: Notify,
}

impl<K> Default for LockTable<K> {
  fn default() -> Self {
    Self {
      held:     Mutex::new(HashSet::new()),
      released: Notify::new(),
    }
  }
}

/// Releases its keys on drop.
#[must_use = "the keys are released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a, K: Hash + Eq> {
  table: &'a LockTable<K>,
  keys:  Vec<K>,
}

impl<K: Hash + Eq + Ord + Clone> LockTable<K> {
  pub fn new() -> Self { Self::default() }

  fn held(&self) -> MutexGuard<'_, HashSet<K>> {
    self.held.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Wait until none of `keys` is held, then hold all of them.
  pub async fn acquire(&self, keys: impl IntoIterator<Item = K>) -> LockGuard<'_, K> {
    let mut keys: Vec<K> = keys.into_iter().collect();
    keys.sort();
    keys.dedup();

    loop {
      // Register for the wake-up before checking, so a release between the
      // check and the await is not missed.
      let notified = self.released.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      {
        let mut held = self.held();
        if keys.iter().all(|k| !held.contains(k)) {
          held.extend(keys.iter().cloned());
          return LockGuard { table: self, keys };
        }
      }

      notified.await;
    }
  }

  /// Whether `key` is currently held.
  pub fn is_held(&self, key: &K) -> bool { self.held().contains(key) }
}

impl<K: Hash + Eq> Drop for LockGuard<'_, K> {
  fn drop(&mut self) {
    {
      let mut held = self.table.held.lock().unwrap_or_else(PoisonError::into_inner);
      for key in &self.keys {
        held.remove(key);
      }
    }
    self.table.released.notify_waiters();
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use super::*;

  #[tokio::test]
  async fn guard_releases_on_drop() {
    let table = LockTable::new();
    let guard = table.acquire([1, 2]).await;
    assert!(table.is_held(&1));
    assert!(table.is_held(&2));
    drop(guard);
    assert!(!table.is_held(&1));
  }

  #[tokio::test]
  async fn overlapping_sets_wait() {
    let table = Arc::new(LockTable::new());
    let guard = table.acquire([1, 2]).await;

    let waiter = {
      let table = Arc::clone(&table);
      tokio::spawn(async move {
        let _guard = table.acquire([2, 3]).await;
      })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    assert!(!table.is_held(&3));

    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), waiter)
      .await
      .expect("waiter should be woken")
      .unwrap();
  }

  #[tokio::test]
  async fn disjoint_sets_do_not_block() {
    let table = LockTable::new();
    let _a = table.acquire(["club-a".to_owned()]).await;
    let b = tokio::time::timeout(Duration::from_millis(100), table.acquire(["club-b".to_owned()]))
      .await;
    assert!(b.is_ok());
  }
}
