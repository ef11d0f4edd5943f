//! Local storage module for task data and the outbound sync queue
//!
//! This module provides database operations using SeaORM for:
//! - Tasks ([`TaskStore`])
//! - Queued sync operations ([`SyncQueue`])
//!
//! Both front ends share one [`StoreSerializer`], so at most one database
//! operation runs at a time and callers are served in arrival order.

pub mod db;
pub mod queue;
pub mod serializer;
pub mod tasks;

use std::sync::Arc;
use thiserror::Error;

pub use db::LocalStorage;
pub use queue::{QueueStats, RealQueueStatus, SyncQueue};
pub use serializer::{StoreGuard, StoreSerializer};
pub use tasks::{TaskStore, UpdateRetryPolicy};

use crate::config::Config;

/// Typed store failures callers may want to match on
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error("Task {id} still missing after {attempts} attempts")]
    RetryExhausted { id: String, attempts: u32 },
}

/// Open the configured database and build the store and queue on top of it
pub async fn open(config: &Config) -> anyhow::Result<(TaskStore, SyncQueue)> {
    let storage = LocalStorage::open(&config.storage).await?;
    let serializer = Arc::new(StoreSerializer::new(storage, config.storage.settle_delay()));
    let tasks = TaskStore::new(
        serializer.clone(),
        UpdateRetryPolicy {
            attempts: config.sync.update_retry_attempts,
            backoff: config.sync.update_retry_backoff(),
        },
    );
    let queue = SyncQueue::new(serializer, config.sync.max_retries);
    Ok((tasks, queue))
}
