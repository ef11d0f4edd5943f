use anyhow::Result;
use log::{debug, info, warn};
use sea_orm::{ActiveValue, IntoActiveModel, TransactionTrait};
use std::sync::Arc;
use std::time::Duration;

use super::{StorageError, StoreSerializer};
use crate::constants::{DEFAULT_UPDATE_RETRY_ATTEMPTS, DEFAULT_UPDATE_RETRY_BACKOFF_MS};
use crate::entities::task::{self, SyncStatus};
use crate::payload::{CreateTaskPayload, UpdateTaskPayload};
use crate::remote::RemoteTask;
use crate::repositories::{SyncOperationRepository, TaskRepository};
use crate::utils::datetime;

/// How hard `update_task` looks for a row before giving up
#[derive(Debug, Clone, Copy)]
pub struct UpdateRetryPolicy {
    /// Extra attempts after the first lookup
    pub attempts: u32,
    /// Delay unit; attempt `n` waits `backoff × n`
    pub backoff: Duration,
}

impl Default for UpdateRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_UPDATE_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_UPDATE_RETRY_BACKOFF_MS),
        }
    }
}

/// Durable task rows with local/remote identity and soft deletion
///
/// Every call goes through the shared [`StoreSerializer`].
#[derive(Clone)]
pub struct TaskStore {
    serializer: Arc<StoreSerializer>,
    retry: UpdateRetryPolicy,
}

impl TaskStore {
    pub fn new(serializer: Arc<StoreSerializer>, retry: UpdateRetryPolicy) -> Self {
        Self { serializer, retry }
    }

    /// Visible tasks for `owner_id`, newest created first
    pub async fn get_all_tasks(&self, owner_id: &str) -> Result<Vec<task::Model>> {
        let storage = self.serializer.acquire().await;
        TaskRepository::get_for_owner(&storage.conn, owner_id).await
    }

    /// Visible task by local or server id
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when no visible row matches
    pub async fn get_task_by_id(&self, id: &str) -> Result<task::Model> {
        let storage = self.serializer.acquire().await;
        TaskRepository::get_by_id(&storage.conn, id)
            .await?
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() }.into())
    }

    /// Task by local or server id, tombstones included
    pub async fn find_task(&self, id: &str) -> Result<Option<task::Model>> {
        let storage = self.serializer.acquire().await;
        TaskRepository::find_any(&storage.conn, id).await
    }

    /// Every row for `owner_id`, tombstones included
    pub async fn get_all_rows_for_owner(&self, owner_id: &str) -> Result<Vec<task::Model>> {
        let storage = self.serializer.acquire().await;
        TaskRepository::get_all_rows_for_owner(&storage.conn, owner_id).await
    }

    /// Rows with local changes that have not reached the server
    pub async fn get_tasks_needing_sync(&self, owner_id: &str) -> Result<Vec<task::Model>> {
        let storage = self.serializer.acquire().await;
        TaskRepository::get_needing_sync(&storage.conn, owner_id).await
    }

    /// Case-insensitive search over title and description
    pub async fn search_tasks(&self, owner_id: &str, query: &str) -> Result<Vec<task::Model>> {
        let storage = self.serializer.acquire().await;
        TaskRepository::search(&storage.conn, owner_id, query).await
    }

    /// Insert a new unsynced task and return its local id
    pub async fn create_task(&self, payload: &CreateTaskPayload, owner_id: &str) -> Result<String> {
        let local_id = datetime::generate_local_id();
        let row = payload.to_active_model(&local_id, owner_id, datetime::now());

        let storage = self.serializer.acquire().await;
        TaskRepository::insert(&storage.conn, row).await?;
        debug!("📝 Created task {} for {}", local_id, owner_id);
        Ok(local_id)
    }

    /// Apply a partial edit to a visible task owned by `owner_id`
    ///
    /// A missing row is looked up again with a growing delay, releasing the
    /// serializer in between so a write queued behind us can land first.
    ///
    /// # Errors
    /// [`StorageError::RetryExhausted`] when the row never shows up
    pub async fn update_task(&self, id: &str, payload: &UpdateTaskPayload, owner_id: &str) -> Result<task::Model> {
        let total_attempts = self.retry.attempts + 1;

        for attempt in 0..total_attempts {
            if attempt > 0 {
                let delay = self.retry.backoff * attempt;
                warn!("⏳ Task {} not found, retrying in {:?} ({}/{})", id, delay, attempt, self.retry.attempts);
                tokio::time::sleep(delay).await;
            }

            let storage = self.serializer.acquire().await;
            let txn = storage.conn.begin().await?;

            let Some(existing) = TaskRepository::get_by_id_for_owner(&txn, id, owner_id).await? else {
                continue;
            };

            let now = datetime::now();
            let mut active = existing.into_active_model();
            payload.apply_to(&mut active);
            active.updated_at = ActiveValue::Set(now);
            active.local_updated_at = ActiveValue::Set(Some(now));
            active.sync_status = ActiveValue::Set(SyncStatus::Pending);
            active.needs_sync = ActiveValue::Set(true);

            let updated = TaskRepository::update(&txn, active).await?;
            txn.commit().await?;
            return Ok(updated);
        }

        Err(StorageError::RetryExhausted {
            id: id.to_string(),
            attempts: total_attempts,
        }
        .into())
    }

    /// Soft delete: the row stays as a tombstone until the delete is pushed
    pub async fn delete_task(&self, id: &str, owner_id: &str) -> Result<task::Model> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        let existing = TaskRepository::get_by_id_for_owner(&txn, id, owner_id)
            .await?
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })?;

        let now = datetime::now();
        let mut active = existing.into_active_model();
        active.is_deleted = ActiveValue::Set(true);
        active.needs_sync = ActiveValue::Set(true);
        active.sync_status = ActiveValue::Set(SyncStatus::Pending);
        active.updated_at = ActiveValue::Set(now);
        active.local_updated_at = ActiveValue::Set(Some(now));

        let deleted = TaskRepository::update(&txn, active).await?;
        txn.commit().await?;
        Ok(deleted)
    }

    /// Remove a row for good. Returns whether a row existed.
    pub async fn permanently_delete_task(&self, id: &str) -> Result<bool> {
        let storage = self.serializer.acquire().await;
        let removed = TaskRepository::delete_by_id(&storage.conn, id).await?;
        if removed > 0 {
            debug!("🗑️ Purged task {}", id);
        }
        Ok(removed > 0)
    }

    /// Remove every row of `owner_id` for good. Returns rows removed.
    pub async fn purge_owner(&self, owner_id: &str) -> Result<u64> {
        let storage = self.serializer.acquire().await;
        TaskRepository::delete_for_owner(&storage.conn, owner_id).await
    }

    /// Bind the server identity after a successful remote create
    pub async fn update_task_server_id(&self, local_id: &str, server_id: &str) -> Result<()> {
        self.acknowledge(local_id, Some(server_id), None).await
    }

    /// Clear the pending flags once the server acknowledged the row
    pub async fn mark_task_as_synced(&self, id: &str) -> Result<()> {
        self.acknowledge(id, None, None).await
    }

    /// Record that queued operation `operation_id` reached the server
    ///
    /// Removes the operation, binds `server_id` when given, and clears the
    /// pending flags only if no other operation is still queued for the task.
    pub async fn acknowledge_operation(&self, operation_id: i32, local_id: &str, server_id: Option<&str>) -> Result<()> {
        self.acknowledge(local_id, server_id, Some(operation_id)).await
    }

    async fn acknowledge(&self, id: &str, server_id: Option<&str>, operation_id: Option<i32>) -> Result<()> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        let existing = TaskRepository::find_any(&txn, id)
            .await?
            .filter(|t| server_id.is_none() || t.local_id == id)
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })?;

        if let Some(operation_id) = operation_id {
            SyncOperationRepository::delete_by_id(&txn, operation_id).await?;
        }
        let outstanding = SyncOperationRepository::get_for_entity(&txn, &existing.local_id).await?;

        let local_id = existing.local_id.clone();
        let mut active = existing.into_active_model();
        if let Some(server_id) = server_id {
            active.server_id = ActiveValue::Set(Some(server_id.to_string()));
        }
        if outstanding.is_empty() {
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
        } else {
            debug!("Task {} still has {} queued operations", local_id, outstanding.len());
            active.sync_status = ActiveValue::Set(SyncStatus::Pending);
            active.needs_sync = ActiveValue::Set(true);
        }
        TaskRepository::update(&txn, active).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Upsert server-provided rows keyed by local id
    ///
    /// Rows are stored as synced, visible and owned by `owner_id` whatever
    /// their incoming flags say.
    pub async fn bulk_insert_tasks(&self, tasks: Vec<task::Model>, owner_id: &str) -> Result<usize> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let count = tasks.len();
        let rows = tasks
            .into_iter()
            .map(|t| task::ActiveModel {
                local_id: ActiveValue::Set(t.local_id),
                server_id: ActiveValue::Set(t.server_id),
                title: ActiveValue::Set(t.title),
                description: ActiveValue::Set(t.description),
                status: ActiveValue::Set(t.status),
                priority: ActiveValue::Set(t.priority),
                due_date: ActiveValue::Set(t.due_date),
                tags: ActiveValue::Set(t.tags),
                image_path: ActiveValue::Set(t.image_path),
                image_url: ActiveValue::Set(t.image_url),
                owner_id: ActiveValue::Set(owner_id.to_string()),
                created_at: ActiveValue::Set(t.created_at),
                updated_at: ActiveValue::Set(t.updated_at),
                local_updated_at: ActiveValue::Set(t.local_updated_at),
                sync_status: ActiveValue::Set(SyncStatus::Synced),
                is_deleted: ActiveValue::Set(false),
                needs_sync: ActiveValue::Set(false),
            })
            .collect();

        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;
        TaskRepository::upsert_many(&txn, rows).await?;
        txn.commit().await?;

        info!("📥 Stored {} server tasks for {}", count, owner_id);
        Ok(count)
    }

    /// Reassign a row to another owner and flag it for sync
    pub async fn update_task_owner(&self, local_id: &str, new_owner_id: &str) -> Result<()> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        let existing = TaskRepository::find_any(&txn, local_id)
            .await?
            .filter(|t| t.local_id == local_id)
            .ok_or_else(|| StorageError::NotFound {
                id: local_id.to_string(),
            })?;

        let mut active = existing.into_active_model();
        active.owner_id = ActiveValue::Set(new_owner_id.to_string());
        active.needs_sync = ActiveValue::Set(true);
        active.sync_status = ActiveValue::Set(SyncStatus::Pending);
        TaskRepository::update(&txn, active).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Overwrite a clean row with a newer server snapshot
    ///
    /// The `needs_sync` and queued-operation checks happen inside the
    /// transaction, so a local edit that landed after the caller's read is
    /// never clobbered. Returns whether the row was overwritten.
    pub async fn apply_server_snapshot(&self, local_id: &str, remote: &RemoteTask) -> Result<bool> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        let Some(existing) = TaskRepository::find_any(&txn, local_id)
            .await?
            .filter(|t| t.local_id == local_id)
        else {
            return Ok(false);
        };
        if existing.needs_sync || !SyncOperationRepository::get_for_entity(&txn, local_id).await?.is_empty() {
            return Ok(false);
        }

        let mut active = existing.into_active_model();
        remote.apply_to(&mut active);
        active.sync_status = ActiveValue::Set(SyncStatus::Synced);
        active.needs_sync = ActiveValue::Set(false);
        TaskRepository::update(&txn, active).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Drop every task and queued operation
    pub async fn clear_all_data(&self) -> Result<()> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;
        let tasks = TaskRepository::delete_all(&txn).await?;
        let operations = SyncOperationRepository::delete_all(&txn).await?;
        txn.commit().await?;

        info!("🧹 Cleared {} tasks and {} queued operations", tasks, operations);
        Ok(())
    }
}
