use anyhow::Result;
use log::{error, info};
use serde::Serialize;

use super::processor::PassReport;
use crate::sync::SyncService;

/// Snapshot of everything that decides whether sync can make progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOverview {
    pub processor_running: bool,
    pub processor_processing: bool,
    pub has_access_token: bool,
    pub is_online: bool,
    pub pending_count: u64,
    pub failed_count: u64,
}

impl SyncOverview {
    /// Human-readable reasons why queued work may not be moving
    pub fn issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::new();
        if !self.processor_running {
            issues.push("Sync processor is not running");
        }
        if !self.has_access_token {
            issues.push("No access token available");
        }
        if !self.is_online {
            issues.push("Device appears to be offline");
        }
        if self.pending_count > 0 && self.is_online && self.has_access_token && self.processor_running {
            issues.push("Operations are pending although sync should be running");
        }
        if self.failed_count > 0 {
            issues.push("Some operations failed and need a manual retry");
        }
        issues
    }
}

impl SyncService {
    /// Gives one failed operation a fresh retry budget, then runs a pass.
    pub async fn retry_operation(&self, id: i32) -> Result<PassReport> {
        self.queue.reset_failed_operation(id).await?;
        Ok(self.processor.trigger().await)
    }

    /// Gives every failed operation a fresh retry budget, then runs a pass.
    pub async fn retry_all_failed(&self) -> Result<PassReport> {
        self.queue.reset_all_failed_operations().await?;
        Ok(self.processor.trigger().await)
    }

    /// Drops an operation from the queue without applying it.
    ///
    /// The task keeps its local state; nothing is pushed for it any more.
    pub async fn discard_operation(&self, id: i32) -> Result<bool> {
        let removed = self.queue.remove_operation(id).await?;
        if removed {
            info!("🗑️ Discarded operation #{}", id);
        }
        Ok(removed)
    }

    /// Current processor, session, network and queue state.
    pub async fn sync_status(&self) -> Result<SyncOverview> {
        let processor = self.processor.status();
        let session = self.session.current_session().await;
        let stats = self.queue.get_queue_stats().await?;

        Ok(SyncOverview {
            processor_running: processor.is_running,
            processor_processing: processor.is_processing,
            has_access_token: session.as_ref().and_then(|s| s.token()).is_some(),
            is_online: self.network.is_online(),
            pending_count: stats.pending,
            failed_count: stats.failed,
        })
    }

    /// Startup maintenance of the queue. Never fails; problems are logged.
    pub async fn cleanup_completed_operations(&self) -> u64 {
        match self.queue.clear_completed_operations().await {
            Ok(cleaned) => {
                if cleaned > 0 {
                    info!("🧹 Cleaned up {} completed sync operations", cleaned);
                }
                cleaned
            }
            Err(e) => {
                error!("❌ Sync queue cleanup failed: {e:#}");
                0
            }
        }
    }
}
