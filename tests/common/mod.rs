#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasksync::config::SyncConfig;
use tasksync::network::NetworkFlag;
use tasksync::payload::{CreateTaskPayload, UpdateTaskPayload};
use tasksync::remote::{RemoteError, RemoteTask, RemoteTaskApi};
use tasksync::session::{Session, StaticSession};
use tasksync::storage::{LocalStorage, StoreSerializer, SyncQueue, TaskStore, UpdateRetryPolicy};
use tasksync::sync::SyncService;

pub const USER_ID: &str = "user-1";
pub const TOKEN: &str = "token-1";
pub const MAX_RETRIES: i32 = 3;

/// Remote call as seen by [`FakeRemoteApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Create(String),
    Update(String),
    Delete(String),
}

/// In-memory stand-in for the remote service
///
/// Created tasks get ids `srv-1`, `srv-2`, ... Calls of a kind set with
/// [`FakeRemoteApi::fail`] are recorded and then fail with a network error.
#[derive(Default)]
pub struct FakeRemoteApi {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<Vec<&'static str>>,
    missing_on_delete: Mutex<bool>,
    server_tasks: Mutex<Vec<RemoteTask>>,
    next_id: AtomicUsize,
}

impl FakeRemoteApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make `kind` ("fetch", "create", "update" or "delete") fail
    pub fn fail(&self, kind: &'static str) {
        self.failing.lock().unwrap().push(kind);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Deletes answer "not found" instead of succeeding
    pub fn lose_deleted_tasks(&self) {
        *self.missing_on_delete.lock().unwrap() = true;
    }

    pub fn set_server_tasks(&self, tasks: Vec<RemoteTask>) {
        *self.server_tasks.lock().unwrap() = tasks;
    }

    fn record(&self, call: Call, kind: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(RemoteError::Network(format!("{kind} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTaskApi for FakeRemoteApi {
    async fn fetch_tasks(&self, _token: &str) -> Result<Vec<RemoteTask>, RemoteError> {
        self.record(Call::Fetch, "fetch")?;
        Ok(self.server_tasks.lock().unwrap().clone())
    }

    async fn fetch_task(&self, _token: &str, id: &str) -> Result<RemoteTask, RemoteError> {
        self.server_tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create_task(&self, _token: &str, payload: &CreateTaskPayload) -> Result<RemoteTask, RemoteError> {
        self.record(Call::Create(payload.title.clone()), "create")?;
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let task = remote_task(&id, &payload.title);
        self.server_tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, _token: &str, id: &str, payload: &UpdateTaskPayload) -> Result<RemoteTask, RemoteError> {
        self.record(Call::Update(id.to_string()), "update")?;
        let title = payload.title.clone().unwrap_or_default();
        Ok(remote_task(id, &title))
    }

    async fn delete_task(&self, _token: &str, id: &str) -> Result<(), RemoteError> {
        self.record(Call::Delete(id.to_string()), "delete")?;
        if *self.missing_on_delete.lock().unwrap() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn upload_image(&self, _token: &str, path: &Path) -> Result<String, RemoteError> {
        Ok(format!("https://cdn.test/{}", path.display()))
    }
}

pub fn remote_task(id: &str, title: &str) -> RemoteTask {
    let now = Utc::now();
    RemoteTask {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        status: Default::default(),
        priority: Default::default(),
        due_date: None,
        tags: Vec::new(),
        image_url: None,
        owner_id: USER_ID.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Store and queue over a fresh in-memory database, without any delays
pub async fn store() -> (TaskStore, SyncQueue) {
    let (_, tasks, queue) = store_parts().await;
    (tasks, queue)
}

/// Like [`store`], also handing out the serializer for raw repository access
pub async fn store_parts() -> (Arc<StoreSerializer>, TaskStore, SyncQueue) {
    let storage = LocalStorage::in_memory().await.unwrap();
    let serializer = Arc::new(StoreSerializer::new(storage, Duration::ZERO));
    let tasks = TaskStore::new(
        serializer.clone(),
        UpdateRetryPolicy {
            attempts: 1,
            backoff: Duration::from_millis(1),
        },
    );
    let queue = SyncQueue::new(serializer.clone(), MAX_RETRIES);
    (serializer, tasks, queue)
}

/// Sync config with zero pacing and a timer too slow to fire during a test
pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        interval_seconds: 3600,
        pacing_before_ms: 0,
        pacing_after_ms: 0,
        max_retries: MAX_RETRIES,
        update_retry_attempts: 1,
        update_retry_backoff_ms: 1,
    }
}

pub struct Harness {
    pub serializer: Arc<StoreSerializer>,
    pub service: SyncService,
    pub tasks: TaskStore,
    pub queue: SyncQueue,
    pub api: Arc<FakeRemoteApi>,
    pub session: Arc<StaticSession>,
    pub network: NetworkFlag,
}

/// Full service wired to fakes, signed in as [`USER_ID`]
pub async fn harness() -> Harness {
    harness_with(Some(Session::user(USER_ID, TOKEN))).await
}

pub async fn harness_with(session: Option<Session>) -> Harness {
    let (serializer, tasks, queue) = store_parts().await;
    let api = Arc::new(FakeRemoteApi::default());
    let session = Arc::new(StaticSession::new(session));
    let network = NetworkFlag::new(true);

    let service = SyncService::new(
        tasks.clone(),
        queue.clone(),
        api.clone(),
        session.clone(),
        Arc::new(network.clone()),
        &fast_sync_config(),
    );

    Harness {
        serializer,
        service,
        tasks,
        queue,
        api,
        session,
        network,
    }
}
