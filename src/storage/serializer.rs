//! FIFO gate in front of the database
//!
//! Every store and queue call holds the gate for its whole duration. Waiters
//! are served in arrival order (tokio's mutex is fair), and the next holder
//! only proceeds once the settling delay since the previous release elapsed.

use std::ops::Deref;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use super::LocalStorage;

struct SerialState {
    storage: LocalStorage,
    released_at: Option<Instant>,
}

/// Single-concurrency, first-come first-served access to [`LocalStorage`]
pub struct StoreSerializer {
    state: Mutex<SerialState>,
    settle: Duration,
}

/// Exclusive access to the storage; releasing it starts the settling delay
pub struct StoreGuard<'a> {
    guard: MutexGuard<'a, SerialState>,
}

impl StoreSerializer {
    pub fn new(storage: LocalStorage, settle: Duration) -> Self {
        Self {
            state: Mutex::new(SerialState {
                storage,
                released_at: None,
            }),
            settle,
        }
    }

    /// Wait for our turn, then for the previous holder's settling delay
    pub async fn acquire(&self) -> StoreGuard<'_> {
        let guard = self.state.lock().await;
        if let Some(released_at) = guard.released_at {
            let ready_at = released_at + self.settle;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        StoreGuard { guard }
    }
}

impl Deref for StoreGuard<'_> {
    type Target = LocalStorage;

    fn deref(&self) -> &LocalStorage {
        &self.guard.storage
    }
}

impl Drop for StoreGuard<'_> {
    fn drop(&mut self) {
        self.guard.released_at = Some(Instant::now());
    }
}
