//! Remote task service contract
//!
//! The HTTP transport lives outside this crate. This module defines the
//! request/response shapes and the async trait the sync processor and the
//! application service call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::entities::task::{self, encode_tags, SyncStatus, TaskPriority, TaskStatus};
use crate::payload::{CreateTaskPayload, UpdateTaskPayload};

/// Task as returned by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response envelope used by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote call failures
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope, mapping unsuccessful or empty responses to errors
    pub fn into_result(self) -> Result<T, RemoteError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(RemoteError::InvalidData("response carried no data".to_string())),
            (false, _) => Err(RemoteError::Server(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}

impl RemoteTask {
    /// Build a synced local row for this server task
    pub fn to_local_model(&self, local_id: &str, owner_id: &str) -> task::Model {
        task::Model {
            local_id: local_id.to_string(),
            server_id: Some(self.id.clone()),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            tags: encode_tags(&self.tags),
            image_path: None,
            image_url: self.image_url.clone(),
            owner_id: owner_id.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            local_updated_at: None,
            sync_status: SyncStatus::Synced,
            is_deleted: false,
            needs_sync: false,
        }
    }

    /// Copy the server's content fields onto an existing row
    pub fn apply_to(&self, active: &mut task::ActiveModel) {
        active.server_id = ActiveValue::Set(Some(self.id.clone()));
        active.title = ActiveValue::Set(self.title.clone());
        active.description = ActiveValue::Set(self.description.clone());
        active.status = ActiveValue::Set(self.status);
        active.priority = ActiveValue::Set(self.priority);
        active.due_date = ActiveValue::Set(self.due_date);
        active.tags = ActiveValue::Set(encode_tags(&self.tags));
        active.image_url = ActiveValue::Set(self.image_url.clone());
        active.updated_at = ActiveValue::Set(self.updated_at);
    }
}

/// Remote task service
///
/// The access token is passed on every call; implementations own timeouts.
#[async_trait]
pub trait RemoteTaskApi: Send + Sync {
    async fn fetch_tasks(&self, token: &str) -> Result<Vec<RemoteTask>, RemoteError>;

    async fn fetch_task(&self, token: &str, id: &str) -> Result<RemoteTask, RemoteError>;

    async fn create_task(&self, token: &str, payload: &CreateTaskPayload) -> Result<RemoteTask, RemoteError>;

    async fn update_task(&self, token: &str, id: &str, payload: &UpdateTaskPayload) -> Result<RemoteTask, RemoteError>;

    async fn delete_task(&self, token: &str, id: &str) -> Result<(), RemoteError>;

    /// Upload an image file, returning its public URL
    async fn upload_image(&self, token: &str, path: &Path) -> Result<String, RemoteError>;
}
