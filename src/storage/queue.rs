use anyhow::Result;
use log::{debug, info, warn};
use sea_orm::{ActiveValue, IntoActiveModel, TransactionTrait};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::StoreSerializer;
use crate::entities::sync_operation::{self, EntityKind, OperationStatus};
use crate::payload::OperationPayload;
use crate::repositories::SyncOperationRepository;
use crate::utils::datetime;

/// Counts reported by [`SyncQueue::get_queue_stats`]
///
/// Completed operations are deleted, so `completed` is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Counts reported by [`SyncQueue::get_real_queue_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RealQueueStatus {
    pub pending: u64,
    pub failed: u64,
    pub completed: u64,
    pub total: u64,
}

/// Durable, ordered log of outbound operations
#[derive(Clone)]
pub struct SyncQueue {
    serializer: Arc<StoreSerializer>,
    max_retries: i32,
}

impl SyncQueue {
    pub fn new(serializer: Arc<StoreSerializer>, max_retries: i32) -> Self {
        Self {
            serializer,
            max_retries,
        }
    }

    /// Append a pending operation. The operation type follows the payload variant.
    pub async fn add_to_queue(&self, payload: &OperationPayload, entity_type: EntityKind, entity_id: &str) -> Result<i32> {
        let operation_type = payload.operation_type();
        let row = sync_operation::ActiveModel {
            id: ActiveValue::NotSet,
            operation_type: ActiveValue::Set(operation_type),
            entity_type: ActiveValue::Set(entity_type),
            entity_id: ActiveValue::Set(entity_id.to_string()),
            payload: ActiveValue::Set(payload.encode()?),
            created_at: ActiveValue::Set(datetime::now()),
            retry_count: ActiveValue::Set(0),
            max_retries: ActiveValue::Set(self.max_retries),
            status: ActiveValue::Set(OperationStatus::Pending),
        };

        let storage = self.serializer.acquire().await;
        let id = SyncOperationRepository::insert(&storage.conn, row).await?;
        debug!("📤 Queued {} #{} for {}", operation_type, id, entity_id);
        Ok(id)
    }

    /// Pending operations in consumption order
    pub async fn get_pending_operations(&self) -> Result<Vec<sync_operation::Model>> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::get_by_status(&storage.conn, OperationStatus::Pending).await
    }

    pub async fn get_failed_operations(&self) -> Result<Vec<sync_operation::Model>> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::get_by_status(&storage.conn, OperationStatus::Failed).await
    }

    pub async fn get_all_operations(&self) -> Result<Vec<sync_operation::Model>> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::get_all(&storage.conn).await
    }

    pub async fn get_operation(&self, id: i32) -> Result<Option<sync_operation::Model>> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::get_by_id(&storage.conn, id).await
    }

    /// Outstanding operations (pending or failed) for one entity
    pub async fn get_operations_for_entity(&self, entity_id: &str) -> Result<Vec<sync_operation::Model>> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::get_for_entity(&storage.conn, entity_id).await
    }

    /// Ids of every entity with outstanding (pending or failed) operations
    pub async fn get_queued_entity_ids(&self) -> Result<HashSet<String>> {
        let storage = self.serializer.acquire().await;
        Ok(SyncOperationRepository::get_entity_ids(&storage.conn)
            .await?
            .into_iter()
            .collect())
    }

    /// Remove a finished operation. Unknown ids are ignored.
    pub async fn mark_operation_completed(&self, id: i32) -> Result<()> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::delete_by_id(&storage.conn, id).await?;
        Ok(())
    }

    /// Record one failure; the operation is parked as failed once
    /// `retry_count` reaches `max_retries`.
    ///
    /// Returns the resulting status, or `None` for an unknown id.
    pub async fn increment_retry_count(&self, id: i32) -> Result<Option<OperationStatus>> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        let Some(operation) = SyncOperationRepository::get_by_id(&txn, id).await? else {
            return Ok(None);
        };

        let retry_count = operation.retry_count + 1;
        let status = if retry_count >= operation.max_retries {
            OperationStatus::Failed
        } else {
            OperationStatus::Pending
        };

        let mut active = operation.into_active_model();
        active.retry_count = ActiveValue::Set(retry_count);
        active.status = ActiveValue::Set(status);
        SyncOperationRepository::update(&txn, active).await?;
        txn.commit().await?;

        if status == OperationStatus::Failed {
            warn!("❌ Operation #{} failed permanently after {} attempts", id, retry_count);
        }
        Ok(Some(status))
    }

    /// Park an operation as failed without consuming a retry
    pub async fn mark_operation_failed(&self, id: i32) -> Result<()> {
        let storage = self.serializer.acquire().await;
        let txn = storage.conn.begin().await?;

        if let Some(operation) = SyncOperationRepository::get_by_id(&txn, id).await? {
            let mut active = operation.into_active_model();
            active.status = ActiveValue::Set(OperationStatus::Failed);
            SyncOperationRepository::update(&txn, active).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Give one failed operation a fresh retry budget. Returns rows reset.
    pub async fn reset_failed_operation(&self, id: i32) -> Result<u64> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::reset_failed(&storage.conn, Some(id)).await
    }

    /// Give every failed operation a fresh retry budget. Returns rows reset.
    pub async fn reset_all_failed_operations(&self) -> Result<u64> {
        let storage = self.serializer.acquire().await;
        let reset = SyncOperationRepository::reset_failed(&storage.conn, None).await?;
        if reset > 0 {
            info!("🔄 Reset {} failed operations", reset);
        }
        Ok(reset)
    }

    /// Completed operations are never stored, so there is nothing to remove
    pub async fn clear_completed_operations(&self) -> Result<u64> {
        Ok(0)
    }

    /// Drop every failed operation. Returns rows removed.
    pub async fn clear_failed_operations(&self) -> Result<u64> {
        let storage = self.serializer.acquire().await;
        SyncOperationRepository::delete_by_status(&storage.conn, OperationStatus::Failed).await
    }

    /// Drop one operation whatever its state. Returns whether it existed.
    pub async fn remove_operation(&self, id: i32) -> Result<bool> {
        let storage = self.serializer.acquire().await;
        Ok(SyncOperationRepository::delete_by_id(&storage.conn, id).await? > 0)
    }

    pub async fn get_queue_stats(&self) -> Result<QueueStats> {
        let storage = self.serializer.acquire().await;
        Ok(QueueStats {
            pending: SyncOperationRepository::count_by_status(&storage.conn, OperationStatus::Pending).await?,
            completed: 0,
            failed: SyncOperationRepository::count_by_status(&storage.conn, OperationStatus::Failed).await?,
        })
    }

    pub async fn get_real_queue_status(&self) -> Result<RealQueueStatus> {
        let stats = self.get_queue_stats().await?;
        Ok(RealQueueStatus {
            pending: stats.pending,
            failed: stats.failed,
            completed: 0,
            total: stats.pending + stats.failed,
        })
    }
}
