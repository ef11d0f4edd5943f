use anyhow::Result;
use log::info;

use crate::constants::GUEST_USER_ID;
use crate::entities::sync_operation::{EntityKind, OperationType};
use crate::payload::{CreateTaskPayload, OperationPayload};
use crate::sync::SyncService;

impl SyncService {
    /// Hands every guest task over to `user_id` and queues it for upload.
    ///
    /// Tasks the guest already deleted and that never reached a server are
    /// purged instead, together with their queued operations. A task that still has a queued create keeps it rather
    /// than getting a second one.
    ///
    /// # Returns
    /// The number of tasks migrated
    pub async fn convert_guest_to_user(&self, user_id: &str) -> Result<usize> {
        let rows = self.tasks.get_all_rows_for_owner(GUEST_USER_ID).await?;
        let mut migrated = 0;

        for row in rows {
            let queued = self.queue.get_operations_for_entity(&row.local_id).await?;

            if row.is_deleted && row.server_id.is_none() {
                for op in &queued {
                    self.queue.remove_operation(op.id).await?;
                }
                self.tasks.permanently_delete_task(&row.local_id).await?;
                continue;
            }

            self.tasks.update_task_owner(&row.local_id, user_id).await?;

            let has_create = queued.iter().any(|op| op.operation_type == OperationType::Create);
            if !has_create && row.server_id.is_none() {
                let payload = OperationPayload::Create(CreateTaskPayload::from_model(&row));
                self.queue
                    .add_to_queue(&payload, EntityKind::Task, &row.local_id)
                    .await?;
            }

            migrated += 1;
        }

        info!("👤 Migrated {} guest tasks to {}", migrated, user_id);
        Ok(migrated)
    }

    /// Permanently removes every guest task along with its queued operations.
    ///
    /// # Returns
    /// The number of tasks removed
    pub async fn clear_guest_data(&self) -> Result<u64> {
        for row in self.tasks.get_all_rows_for_owner(GUEST_USER_ID).await? {
            for op in self.queue.get_operations_for_entity(&row.local_id).await? {
                self.queue.remove_operation(op.id).await?;
            }
        }

        let removed = self.tasks.purge_owner(GUEST_USER_ID).await?;
        info!("🧹 Cleared {} guest tasks", removed);
        Ok(removed)
    }
}
