//! Conflict detection and resolution between a local row and a server version
//!
//! Everything here is pure: no storage access, no clock other than the
//! `updated_at` stamp of merged results.

use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;

use super::text_merge;
use crate::constants::CONFLICT_WINDOW_SECS;
use crate::entities::task;
use crate::utils::datetime;

/// How [`resolve_conflict`] picks a winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    /// Newer `updated_at` wins; ties go to the server
    #[default]
    LastWriteWins,
    /// Server version with text fields merged and tags unioned
    Merge,
}

/// Field that differs between two versions of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    Title,
    Description,
    Status,
    Priority,
    DueDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConflictSummary {
    pub has_conflict: bool,
    pub fields: Vec<ConflictField>,
}

/// Pick or build the version to keep, using the local row as merge base
pub fn resolve_conflict(local: &task::Model, server: &task::Model, strategy: ResolutionStrategy) -> task::Model {
    resolve_conflict_with_base(None, local, server, strategy)
}

/// Same as [`resolve_conflict`] with an explicit pre-edit snapshot as merge base
pub fn resolve_conflict_with_base(
    base: Option<&task::Model>,
    local: &task::Model,
    server: &task::Model,
    strategy: ResolutionStrategy,
) -> task::Model {
    match strategy {
        ResolutionStrategy::LastWriteWins => {
            if local.updated_at > server.updated_at {
                local.clone()
            } else {
                server.clone()
            }
        }
        ResolutionStrategy::Merge => {
            let base = base.unwrap_or(local);
            let mut merged = server.clone();
            merged.local_id = local.local_id.clone();
            merged.title = merge_text(&base.title, &local.title, &server.title);
            merged.description = merge_optional_text(
                base.description.as_deref(),
                local.description.as_deref(),
                server.description.as_deref(),
            );
            merged.tags = task::encode_tags(&merge_tags(&local.tags(), &server.tags()));
            merged.updated_at = datetime::now();
            merged
        }
    }
}

/// Three-way text merge; any internal failure keeps the local text
pub fn merge_text(base: &str, local: &str, server: &str) -> String {
    match text_merge::merge(base, local, server) {
        Ok(merged) => merged,
        Err(e) => {
            warn!("⚠️ Text merge failed, keeping local value: {}", e);
            local.to_string()
        }
    }
}

/// [`merge_text`] for nullable fields; absent reads as empty
pub fn merge_optional_text(base: Option<&str>, local: Option<&str>, server: Option<&str>) -> Option<String> {
    if local == server {
        return local.map(str::to_string);
    }
    let merged = merge_text(base.unwrap_or(""), local.unwrap_or(""), server.unwrap_or(""));
    if merged.is_empty() && (local.is_none() || server.is_none()) {
        None
    } else {
        Some(merged)
    }
}

/// Union of both tag lists, deduplicated and sorted
pub fn merge_tags(local: &[String], server: &[String]) -> Vec<String> {
    local
        .iter()
        .chain(server)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Both sides changed content within the concurrency window
///
/// Without a local edit timestamp there is nothing to compare, so no conflict.
pub fn detect_conflict(local: &task::Model, server: &task::Model) -> bool {
    let Some(local_edit) = local.local_updated_at else {
        return false;
    };

    let content_differs =
        local.title != server.title || local.description != server.description || local.status != server.status;

    content_differs && datetime::within_window(&local_edit, &server.updated_at, CONFLICT_WINDOW_SECS)
}

pub fn get_conflict_summary(local: &task::Model, server: &task::Model) -> ConflictSummary {
    let mut fields = Vec::new();
    if local.title != server.title {
        fields.push(ConflictField::Title);
    }
    if local.description != server.description {
        fields.push(ConflictField::Description);
    }
    if local.status != server.status {
        fields.push(ConflictField::Status);
    }
    if local.priority != server.priority {
        fields.push(ConflictField::Priority);
    }
    if local.due_date != server.due_date {
        fields.push(ConflictField::DueDate);
    }

    ConflictSummary {
        has_conflict: !fields.is_empty(),
        fields,
    }
}
