//! Background processor draining the sync queue against the remote API
//!
//! A pass takes the pending operations in queue order and pushes them one at
//! a time. The first failure ends the pass, so an operation never overtakes
//! an earlier one for the same task.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::entities::sync_operation;
use crate::network::NetworkMonitor;
use crate::payload::{CreateTaskPayload, OperationPayload, PayloadError, UpdateTaskPayload};
use crate::remote::{RemoteError, RemoteTaskApi};
use crate::session::SessionProvider;
use crate::storage::{StorageError, SyncQueue, TaskStore};

/// Timing knobs of the processor
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// Period of the background timer
    pub interval: Duration,
    /// Pause before each remote call
    pub pacing_before: Duration,
    /// Pause after each applied operation
    pub pacing_after: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ProcessorConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: config.interval(),
            pacing_before: config.pacing_before(),
            pacing_after: config.pacing_after(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessorStatus {
    pub is_running: bool,
    pub is_processing: bool,
}

/// Why a pass did not touch the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessing,
    GuestSession,
    Offline,
    NoCredentials,
    /// The pending operations could not be read
    StoreUnavailable,
}

/// Outcome of one pass. Passes never fail; problems end up in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReport {
    Skipped(SkipReason),
    Completed {
        /// Operations applied and removed from the queue
        processed: usize,
        /// Operations that failed (the pass stops at the first one)
        failed: usize,
        /// Operations of this pass's snapshot still in the queue
        remaining: usize,
    },
}

/// Why a single operation could not be applied
#[derive(Debug, Error)]
pub enum OperationFailure {
    #[error(transparent)]
    Malformed(#[from] PayloadError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("local store error: {0:#}")]
    Local(anyhow::Error),
}

struct Timer {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct ProcessorInner {
    tasks: TaskStore,
    queue: SyncQueue,
    api: Arc<dyn RemoteTaskApi>,
    session: Arc<dyn SessionProvider>,
    network: Arc<dyn NetworkMonitor>,
    config: ProcessorConfig,
    in_flight: AtomicUsize,
    timer: Mutex<Option<Timer>>,
}

/// Marks a pass in flight until dropped
struct PassGuard<'a>(&'a AtomicUsize);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Periodic and on-demand queue drainer
///
/// Cloning is cheap and every clone drives the same processor.
#[derive(Clone)]
pub struct SyncProcessor {
    inner: Arc<ProcessorInner>,
}

impl SyncProcessor {
    pub fn new(
        tasks: TaskStore,
        queue: SyncQueue,
        api: Arc<dyn RemoteTaskApi>,
        session: Arc<dyn SessionProvider>,
        network: Arc<dyn NetworkMonitor>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessorInner {
                tasks,
                queue,
                api,
                session,
                network,
                config,
                in_flight: AtomicUsize::new(0),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Start the periodic timer and run one pass right away
    ///
    /// Returns `false` without starting when the current session is a guest.
    /// Starting an already running processor only runs the immediate pass.
    pub async fn start(&self) -> bool {
        if let Some(session) = self.inner.session.current_session().await {
            if session.is_guest {
                info!("👤 Guest session, sync processor not started");
                return false;
            }
        }

        {
            let mut timer = self.inner.lock_timer();
            let running = timer.as_ref().is_some_and(|t| !t.handle.is_finished());
            if !running {
                *timer = Some(Self::spawn_timer(Arc::downgrade(&self.inner), self.inner.config.interval));
                info!("▶️ Sync processor started (every {:?})", self.inner.config.interval);
            }
        }

        self.process_once().await;
        true
    }

    /// Stop the timer. A pass already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(timer) = self.inner.lock_timer().take() {
            let _ = timer.stop.send(true);
            info!("⏹️ Sync processor stopped");
        }
    }

    pub fn status(&self) -> ProcessorStatus {
        let is_running = self
            .inner
            .lock_timer()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished());
        ProcessorStatus {
            is_running,
            is_processing: self.inner.in_flight.load(Ordering::SeqCst) > 0,
        }
    }

    /// Run one pass now
    pub async fn process_once(&self) -> PassReport {
        self.inner.run_pass().await
    }

    /// Forced pass requested by the application, e.g. after a local edit
    pub async fn trigger(&self) -> PassReport {
        debug!("🔄 Manual sync triggered");
        self.inner.run_pass().await
    }

    fn spawn_timer(inner: Weak<ProcessorInner>, period: Duration) -> Timer {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }
                // The pass runs outside the select so a stop never cuts it short
                let Some(inner) = inner.upgrade() else { break };
                inner.run_pass().await;
            }
        });
        Timer { stop, handle }
    }
}

impl ProcessorInner {
    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        self.in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| PassGuard(&self.in_flight))
    }

    async fn run_pass(&self) -> PassReport {
        let Some(_guard) = self.try_begin_pass() else {
            debug!("⏳ Sync pass already in progress");
            return PassReport::Skipped(SkipReason::AlreadyProcessing);
        };

        let session = self.session.current_session().await;
        if session.as_ref().is_some_and(|s| s.is_guest) {
            return PassReport::Skipped(SkipReason::GuestSession);
        }
        if !self.network.is_online() {
            debug!("📴 Offline, skipping sync pass");
            return PassReport::Skipped(SkipReason::Offline);
        }
        let Some(token) = session.as_ref().and_then(|s| s.token()).map(str::to_string) else {
            debug!("🔑 No access token, skipping sync pass");
            return PassReport::Skipped(SkipReason::NoCredentials);
        };

        let operations = match self.queue.get_pending_operations().await {
            Ok(operations) => operations,
            Err(e) => {
                error!("❌ Failed to read sync queue: {e:#}");
                return PassReport::Skipped(SkipReason::StoreUnavailable);
            }
        };
        if operations.is_empty() {
            return PassReport::Completed {
                processed: 0,
                failed: 0,
                remaining: 0,
            };
        }

        info!("🔄 Processing {} queued operations", operations.len());
        let total = operations.len();
        let mut processed = 0;

        for operation in &operations {
            if let Err(failure) = self.apply(operation, &token).await {
                self.record_failure(operation, &failure).await;
                return PassReport::Completed {
                    processed,
                    failed: 1,
                    remaining: total - processed,
                };
            }

            if let Err(e) = self.queue.mark_operation_completed(operation.id).await {
                error!("❌ Applied operation #{} but could not remove it: {e:#}", operation.id);
                return PassReport::Completed {
                    processed,
                    failed: 0,
                    remaining: total - processed,
                };
            }
            processed += 1;
            tokio::time::sleep(self.config.pacing_after).await;
        }

        info!("✅ Sync pass finished, {} operations applied", processed);
        PassReport::Completed {
            processed,
            failed: 0,
            remaining: 0,
        }
    }

    async fn apply(&self, operation: &sync_operation::Model, token: &str) -> Result<(), OperationFailure> {
        let payload = OperationPayload::decode(operation.operation_type, operation.payload.as_deref())?;
        tokio::time::sleep(self.config.pacing_before).await;

        match payload {
            OperationPayload::Create(payload) => self.push_create(operation, &payload, token).await,
            OperationPayload::Update(payload) => self.push_update(operation, &payload, token).await,
            OperationPayload::Delete => self.push_delete(&operation.entity_id, token).await,
        }
    }

    async fn push_create(
        &self,
        operation: &sync_operation::Model,
        payload: &CreateTaskPayload,
        token: &str,
    ) -> Result<(), OperationFailure> {
        let local_id = operation.entity_id.as_str();
        let task = self.tasks.find_task(local_id).await.map_err(OperationFailure::Local)?;
        let Some(task) = task else {
            debug!("Task {local_id} no longer exists, nothing to create");
            return Ok(());
        };
        if let Some(server_id) = &task.server_id {
            debug!("Task {local_id} already created remotely as {server_id}");
            return self
                .tasks
                .acknowledge_operation(operation.id, local_id, None)
                .await
                .map_err(OperationFailure::Local);
        }

        let remote = self.api.create_task(token, payload).await?;
        self.tasks
            .acknowledge_operation(operation.id, local_id, Some(&remote.id))
            .await
            .map_err(OperationFailure::Local)?;
        debug!("✅ Created task {local_id} remotely as {}", remote.id);
        Ok(())
    }

    async fn push_update(
        &self,
        operation: &sync_operation::Model,
        payload: &UpdateTaskPayload,
        token: &str,
    ) -> Result<(), OperationFailure> {
        let local_id = operation.entity_id.as_str();
        let task = self
            .tasks
            .find_task(local_id)
            .await
            .map_err(OperationFailure::Local)?
            .ok_or_else(|| {
                OperationFailure::Local(StorageError::NotFound { id: local_id.to_string() }.into())
            })?;

        // Not yet bound to a server id: the local id stands in
        self.api.update_task(token, task.external_id(), payload).await?;
        self.tasks
            .acknowledge_operation(operation.id, &task.local_id, None)
            .await
            .map_err(OperationFailure::Local)?;
        Ok(())
    }

    async fn push_delete(&self, local_id: &str, token: &str) -> Result<(), OperationFailure> {
        let Some(task) = self.tasks.find_task(local_id).await.map_err(OperationFailure::Local)? else {
            return Ok(());
        };

        if let Some(server_id) = &task.server_id {
            match self.api.delete_task(token, server_id).await {
                Ok(()) => {}
                Err(RemoteError::NotFound(_)) => debug!("Task {server_id} already gone remotely"),
                Err(e) => return Err(e.into()),
            }
        }

        self.tasks
            .permanently_delete_task(&task.local_id)
            .await
            .map_err(OperationFailure::Local)?;
        Ok(())
    }

    async fn record_failure(&self, operation: &sync_operation::Model, failure: &OperationFailure) {
        let recorded = match failure {
            OperationFailure::Malformed(e) => {
                error!("❌ Parking {} #{} as failed, malformed payload: {e}", operation.operation_type, operation.id);
                self.queue.mark_operation_failed(operation.id).await
            }
            _ => {
                warn!("⚠️ {} #{} failed: {failure}", operation.operation_type, operation.id);
                self.queue.increment_retry_count(operation.id).await.map(|_| ())
            }
        };

        if let Err(e) = recorded {
            error!("❌ Could not record failure of operation #{}: {e:#}", operation.id);
        }
    }
}
