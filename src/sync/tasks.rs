use anyhow::Result;
use log::{info, warn};

use super::reconcile::reconcile_server_tasks;
use crate::entities::sync_operation::EntityKind;
use crate::entities::task;
use crate::payload::{CreateTaskPayload, OperationPayload, UpdateTaskPayload};
use crate::sync::SyncService;

impl SyncService {
    /// Creates a task locally and queues its remote creation.
    ///
    /// # Returns
    /// The stored task, still flagged as needing sync
    ///
    /// # Errors
    /// Returns an error when no session is active or the store write fails
    pub async fn create_task(&self, payload: CreateTaskPayload) -> Result<task::Model> {
        let session = self.require_session().await?;

        let local_id = self.tasks.create_task(&payload, &session.id).await?;
        self.queue
            .add_to_queue(&OperationPayload::Create(payload), EntityKind::Task, &local_id)
            .await?;

        self.tasks.get_task_by_id(&local_id).await
    }

    /// Applies a partial edit locally and queues it for the server.
    ///
    /// `id` may be the local or the server id; the queued operation always
    /// refers to the task's local id.
    ///
    /// # Errors
    /// Returns an error when no session is active or the task cannot be found
    pub async fn update_task(&self, id: &str, payload: UpdateTaskPayload) -> Result<task::Model> {
        let session = self.require_session().await?;

        let updated = self.tasks.update_task(id, &payload, &session.id).await?;
        self.queue
            .add_to_queue(&OperationPayload::Update(payload), EntityKind::Task, &updated.local_id)
            .await?;

        Ok(updated)
    }

    /// Tombstones a task locally and queues its remote deletion.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let session = self.require_session().await?;

        let deleted = self.tasks.delete_task(id, &session.id).await?;
        self.queue
            .add_to_queue(&OperationPayload::Delete, EntityKind::Task, &deleted.local_id)
            .await?;

        Ok(())
    }

    /// Get a single visible task by local or server id (fast)
    pub async fn get_task(&self, id: &str) -> Result<task::Model> {
        self.tasks.get_task_by_id(id).await
    }

    /// Visible tasks of the current session from local storage (fast)
    pub async fn list_tasks(&self) -> Result<Vec<task::Model>> {
        let session = self.require_session().await?;
        self.tasks.get_all_tasks(&session.id).await
    }

    /// Searches the current session's tasks by title and description
    pub async fn search_tasks(&self, query: &str) -> Result<Vec<task::Model>> {
        let session = self.require_session().await?;
        self.tasks.search_tasks(&session.id, query).await
    }

    /// Returns local tasks, refreshed from the server when possible.
    ///
    /// With a signed-in session and connectivity, server tasks are fetched and
    /// reconciled first. A failed fetch is logged and the local list returned.
    pub async fn fetch_tasks(&self) -> Result<Vec<task::Model>> {
        let session = self.require_session().await?;

        if let Some(token) = session.token().filter(|_| !session.is_guest) {
            if self.network.is_online() {
                match self.api.fetch_tasks(token).await {
                    Ok(server_tasks) => {
                        info!("✅ Fetched {} tasks from server", server_tasks.len());
                        let report = reconcile_server_tasks(&self.tasks, &self.queue, &server_tasks, &session.id).await?;
                        for (local_id, summary) in &report.conflicts {
                            warn!("⚠️ Task {} has concurrent edits on {:?}", local_id, summary.fields);
                        }
                    }
                    Err(e) => warn!("⚠️ Failed to fetch server tasks, using local data: {e}"),
                }
            }
        }

        self.tasks.get_all_tasks(&session.id).await
    }
}
