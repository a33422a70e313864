//! Per-order write serialisation for a single process.
//!
//! The version column is still the source of truth for concurrent writers: these locks only stop writers inside this
//! process from racing each other, so a burst of identical gateway notifications is applied one after another instead
//! of burning through the retry budget. Share one [`OrderLocks`] between every API that writes orders.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::Rng;
use tokio::sync::OwnedMutexGuard;

use crate::db_types::OrderId;

#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<OrderId, Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other writer in this process holds the order, then holds it until the guard is dropped.
    pub async fn lock(&self, id: &OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody is holding or waiting on are only referenced by the map
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of orders with a writer holding or waiting on the lock.
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|l| Arc::strong_count(l) > 1).count()
    }
}

/// Jittered pause before retrying after a version conflict with a writer outside this process.
pub async fn conflict_backoff(attempt: usize) {
    let millis = rand::thread_rng().gen_range(5..=20) * attempt as u64;
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
