//! Synchronization service module for tasksync.
//!
//! This module provides the [`SyncService`] struct, the application-facing
//! entry point tying the local store, the outbound queue and the background
//! [`SyncProcessor`] together.
//!
//! The sync service offers:
//! - Task CRUD that writes locally first and records intent in the queue
//! - Server fetches reconciled into local state ([`reconcile`])
//! - Guest-to-account migration
//! - Recovery of server data after a local wipe
//! - Queue maintenance and sync diagnostics

pub mod conflict;
pub mod filter;
pub mod guest;
pub mod processor;
pub mod queue;
pub mod reconcile;
pub mod recovery;
pub mod tasks;
pub mod text_merge;

use anyhow::Result;
use std::sync::Arc;

pub use processor::{PassReport, ProcessorConfig, ProcessorStatus, SkipReason, SyncProcessor};
pub use queue::SyncOverview;

use crate::config::SyncConfig;
use crate::constants::ERROR_NO_SESSION;
use crate::network::NetworkMonitor;
use crate::remote::RemoteTaskApi;
use crate::session::{Session, SessionProvider};
use crate::storage::{SyncQueue, TaskStore};

/// Service that manages tasks locally and their replication to the server.
///
/// Every mutation lands in the local store first and is mirrored by an
/// operation in the [`SyncQueue`]; the [`SyncProcessor`] pushes those in the
/// background. Reads are always served from the local store.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use tasksync::config::Config;
/// use tasksync::network::NetworkFlag;
/// use tasksync::payload::CreateTaskPayload;
/// use tasksync::remote::RemoteTaskApi;
/// use tasksync::session::{Session, StaticSession};
/// use tasksync::sync::SyncService;
///
/// # async fn example(api: Arc<dyn RemoteTaskApi>) -> anyhow::Result<()> {
/// let config = Config::default();
/// let (tasks, queue) = tasksync::storage::open(&config).await?;
/// let session = Arc::new(StaticSession::new(Some(Session::user("user-1", "token"))));
/// let service = SyncService::new(tasks, queue, api, session, Arc::new(NetworkFlag::default()), &config.sync);
///
/// service.start().await;
/// let task = service.create_task(CreateTaskPayload::new("Buy milk")).await?;
/// println!("created {}", task.local_id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncService {
    tasks: TaskStore,
    queue: SyncQueue,
    processor: SyncProcessor,
    api: Arc<dyn RemoteTaskApi>,
    session: Arc<dyn SessionProvider>,
    network: Arc<dyn NetworkMonitor>,
}

impl SyncService {
    pub fn new(
        tasks: TaskStore,
        queue: SyncQueue,
        api: Arc<dyn RemoteTaskApi>,
        session: Arc<dyn SessionProvider>,
        network: Arc<dyn NetworkMonitor>,
        config: &SyncConfig,
    ) -> Self {
        let processor = SyncProcessor::new(
            tasks.clone(),
            queue.clone(),
            api.clone(),
            session.clone(),
            network.clone(),
            ProcessorConfig::from(config),
        );

        Self {
            tasks,
            queue,
            processor,
            api,
            session,
            network,
        }
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn processor(&self) -> &SyncProcessor {
        &self.processor
    }

    /// Start background sync. Guests stay local-only and get `false`.
    pub async fn start(&self) -> bool {
        self.cleanup_completed_operations().await;
        self.processor.start().await
    }

    pub fn stop(&self) {
        self.processor.stop();
    }

    /// The signed-in session, or an error when nobody is
    async fn require_session(&self) -> Result<Session> {
        self.session
            .current_session()
            .await
            .ok_or_else(|| anyhow::anyhow!(ERROR_NO_SESSION))
    }
}
