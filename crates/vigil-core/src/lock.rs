//! Per-subject mutual exclusion.
//!
//! The store offers no atomic "look up, then create" operation, so two turns
//! for the same subject could both see "no record for today" and both create
//! one. [`SubjectLocks`] hands out one async mutex per subject; holding its
//! guard across the whole lookup-then-write sequence serialises those turns.
//! Different subjects never contend.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::subject::SubjectName;

/// Held while a subject's sequence runs; dropping it releases the subject.
pub type SubjectGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct SubjectLocks {
  inner: Mutex<HashMap<SubjectName, Arc<AsyncMutex<()>>>>,
}

impl SubjectLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive access to `subject`.
  pub async fn acquire(&self, subject: &SubjectName) -> SubjectGuard {
    let lock = {
      let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      // An entry only the map refers to is neither held nor awaited.
      map.retain(|_, lock| Arc::strong_count(lock) > 1);
      map.entry(subject.clone()).or_default().clone()
    };
    lock.lock_owned().await
  }

  /// Number of subjects currently held or awaited.
  pub fn active(&self) -> usize {
    let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    map.values().filter(|lock| Arc::strong_count(lock) > 1).count()
  }
}
