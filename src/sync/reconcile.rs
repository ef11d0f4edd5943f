//! Folding a server snapshot into local state
//!
//! Rows with unsynced local edits always win: the server copy is ignored for
//! them until their queued operations went through. The queue decides, so a
//! row still counts as edited while any operation for it is stored.

use anyhow::Result;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

use super::conflict::{detect_conflict, get_conflict_summary, ConflictSummary};
use crate::entities::task;
use crate::remote::RemoteTask;
use crate::storage::{SyncQueue, TaskStore};
use crate::utils::datetime;

/// What [`reconcile_server_tasks`] did with each server task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Unknown locally, stored as new synced rows
    pub inserted: usize,
    /// Clean local rows overwritten by a newer server version
    pub updated: usize,
    /// Clean local rows already as new as the server's
    pub unchanged: usize,
    /// Rows left alone because of unsynced local edits
    pub deferred: usize,
    /// Deferred rows whose edits look concurrent with the server's, by local id
    pub conflicts: Vec<(String, ConflictSummary)>,
}

/// Merge `server_tasks` into the store for `owner_id`
///
/// Local rows, tombstones included, are keyed by server id, falling back to
/// the local id for rows never pushed.
pub async fn reconcile_server_tasks(
    store: &TaskStore,
    queue: &SyncQueue,
    server_tasks: &[RemoteTask],
    owner_id: &str,
) -> Result<ReconcileReport> {
    let local_rows = store.get_all_rows_for_owner(owner_id).await?;
    let queued = queue.get_queued_entity_ids().await?;
    let by_identity: HashMap<&str, &task::Model> = local_rows.iter().map(|t| (t.external_id(), t)).collect();

    let mut report = ReconcileReport::default();
    let mut fresh = Vec::new();
    let mut seen = HashSet::new();

    for remote in server_tasks {
        if !seen.insert(remote.id.as_str()) {
            continue;
        }

        let Some(local) = by_identity.get(remote.id.as_str()) else {
            fresh.push(remote.to_local_model(&datetime::generate_local_id(), owner_id));
            continue;
        };

        if local.needs_sync || queued.contains(&local.local_id) {
            report.deferred += 1;
            let server_view = remote.to_local_model(&local.local_id, owner_id);
            if detect_conflict(local, &server_view) {
                debug!("⚠️ Concurrent edits on task {}", local.local_id);
                report
                    .conflicts
                    .push((local.local_id.clone(), get_conflict_summary(local, &server_view)));
            }
            continue;
        }

        if remote.updated_at > local.updated_at && store.apply_server_snapshot(&local.local_id, remote).await? {
            report.updated += 1;
        } else {
            report.unchanged += 1;
        }
    }

    report.inserted = store.bulk_insert_tasks(fresh, owner_id).await?;

    info!(
        "🔀 Reconciled {} server tasks: {} new, {} updated, {} deferred",
        server_tasks.len(),
        report.inserted,
        report.updated,
        report.deferred
    );
    Ok(report)
}
