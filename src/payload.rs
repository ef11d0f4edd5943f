//! Typed task payloads and their queue encoding
//!
//! Queue rows store payloads as JSON text. The operation type column decides
//! which payload shape a row carries, so decoding is keyed on it.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::entities::sync_operation::OperationType;
use crate::entities::task::{self, encode_tags, TaskPriority, TaskStatus};

/// Fields of a new task
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateTaskPayload {
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
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial task edit. `None` leaves a field unchanged; for the clearable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateTaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub image_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from an absent field
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl CreateTaskPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Build a fresh row for this payload. The row starts unsynced.
    pub fn to_active_model(&self, local_id: &str, owner_id: &str, now: DateTime<Utc>) -> task::ActiveModel {
        task::ActiveModel {
            local_id: ActiveValue::Set(local_id.to_string()),
            server_id: ActiveValue::Set(None),
            title: ActiveValue::Set(self.title.clone()),
            description: ActiveValue::Set(self.description.clone()),
            status: ActiveValue::Set(self.status),
            priority: ActiveValue::Set(self.priority),
            due_date: ActiveValue::Set(self.due_date),
            tags: ActiveValue::Set(encode_tags(&self.tags)),
            image_path: ActiveValue::Set(self.image_path.clone()),
            image_url: ActiveValue::Set(self.image_url.clone()),
            owner_id: ActiveValue::Set(owner_id.to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            local_updated_at: ActiveValue::Set(Some(now)),
            sync_status: ActiveValue::Set(task::SyncStatus::Pending),
            is_deleted: ActiveValue::Set(false),
            needs_sync: ActiveValue::Set(true),
        }
    }

    /// Snapshot of an existing row, used when a local-only task has to be pushed
    pub fn from_model(model: &task::Model) -> Self {
        Self {
            title: model.title.clone(),
            description: model.description.clone(),
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            tags: model.tags(),
            image_path: model.image_path.clone(),
            image_url: model.image_url.clone(),
        }
    }
}

impl UpdateTaskPayload {
    /// Copy the provided fields onto `active`
    pub fn apply_to(&self, active: &mut task::ActiveModel) {
        if let Some(title) = &self.title {
            active.title = ActiveValue::Set(title.clone());
        }
        if let Some(description) = &self.description {
            active.description = ActiveValue::Set(description.clone());
        }
        if let Some(status) = self.status {
            active.status = ActiveValue::Set(status);
        }
        if let Some(priority) = self.priority {
            active.priority = ActiveValue::Set(priority);
        }
        if let Some(due_date) = self.due_date {
            active.due_date = ActiveValue::Set(due_date);
        }
        if let Some(tags) = &self.tags {
            active.tags = ActiveValue::Set(encode_tags(tags));
        }
        if let Some(image_path) = &self.image_path {
            active.image_path = ActiveValue::Set(image_path.clone());
        }
        if let Some(image_url) = &self.image_url {
            active.image_url = ActiveValue::Set(image_url.clone());
        }
    }
}

/// Errors decoding or encoding a queued payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("{0} operation is missing its payload")]
    Missing(OperationType),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Payload of a queued operation, one variant per operation type
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    Create(CreateTaskPayload),
    Update(UpdateTaskPayload),
    Delete,
}

impl OperationPayload {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Create(_) => OperationType::Create,
            Self::Update(_) => OperationType::Update,
            Self::Delete => OperationType::Delete,
        }
    }

    /// Serialize for the `payload` column. Deletes carry nothing.
    pub fn encode(&self) -> Result<Option<String>, PayloadError> {
        Ok(match self {
            Self::Create(payload) => Some(serde_json::to_string(payload)?),
            Self::Update(payload) => Some(serde_json::to_string(payload)?),
            Self::Delete => None,
        })
    }

    /// Decode a stored payload according to its operation type
    pub fn decode(operation_type: OperationType, raw: Option<&str>) -> Result<Self, PayloadError> {
        match operation_type {
            OperationType::Delete => Ok(Self::Delete),
            OperationType::Create => {
                let raw = raw.ok_or(PayloadError::Missing(operation_type))?;
                Ok(Self::Create(serde_json::from_str(raw)?))
            }
            OperationType::Update => {
                let raw = raw.ok_or(PayloadError::Missing(operation_type))?;
                Ok(Self::Update(serde_json::from_str(raw)?))
            }
        }
    }
}
