use tasksync::entities::task::{SyncStatus, TaskPriority, TaskStatus};
use tasksync::payload::{CreateTaskPayload, UpdateTaskPayload};
use std::time::Duration;
use tasksync::storage::{StorageError, TaskStore, UpdateRetryPolicy};
use tasksync::utils::datetime;
use tokio::time::Instant;

use crate::common::{remote_task, store, store_parts, USER_ID};

/// Store with the production retry shape: three extra lookups, 200ms × attempt apart
async fn patient_store() -> TaskStore {
    let (serializer, _, _) = store_parts().await;
    TaskStore::new(
        serializer,
        UpdateRetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(200),
        },
    )
}

#[tokio::test]
async fn test_create_task_starts_unsynced() {
    let (tasks, _) = store().await;

    let local_id = tasks.create_task(&CreateTaskPayload::new("Buy milk"), USER_ID).await.unwrap();
    assert!(datetime::is_local_id(&local_id));

    let task = tasks.get_task_by_id(&local_id).await.unwrap();
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.owner_id, USER_ID);
    assert_eq!(task.server_id, None);
    assert_eq!(task.sync_status, SyncStatus::Pending);
    assert!(task.needs_sync);
    assert!(!task.is_deleted);
}

#[tokio::test]
async fn test_get_all_tasks_is_per_owner_and_newest_first() {
    let (tasks, _) = store().await;

    let first = tasks.create_task(&CreateTaskPayload::new("first"), USER_ID).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = tasks.create_task(&CreateTaskPayload::new("second"), USER_ID).await.unwrap();
    tasks.create_task(&CreateTaskPayload::new("other"), "user-2").await.unwrap();

    let listed: Vec<String> = tasks
        .get_all_tasks(USER_ID)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.local_id)
        .collect();
    assert_eq!(listed, vec![second, first]);
}

#[tokio::test]
async fn test_server_id_binding_allows_lookup_by_either_id() {
    let (tasks, _) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("Call Bob"), USER_ID).await.unwrap();

    tasks.update_task_server_id(&local_id, "srv-42").await.unwrap();

    let by_local = tasks.get_task_by_id(&local_id).await.unwrap();
    let by_server = tasks.get_task_by_id("srv-42").await.unwrap();
    assert_eq!(by_local, by_server);
    assert_eq!(by_local.server_id.as_deref(), Some("srv-42"));
    assert_eq!(by_local.sync_status, SyncStatus::Synced);
    assert!(!by_local.needs_sync);
}

#[tokio::test]
async fn test_update_task_applies_partial_edit() {
    let (tasks, _) = store().await;
    let mut payload = CreateTaskPayload::new("Draft report");
    payload.description = Some("first pass".to_string());
    let local_id = tasks.create_task(&payload, USER_ID).await.unwrap();
    tasks.mark_task_as_synced(&local_id).await.unwrap();

    let edit = UpdateTaskPayload {
        status: Some(TaskStatus::InProgress),
        priority: Some(TaskPriority::High),
        description: Some(None),
        ..Default::default()
    };
    let updated = tasks.update_task(&local_id, &edit, USER_ID).await.unwrap();

    assert_eq!(updated.title, "Draft report");
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.description, None);
    assert!(updated.needs_sync);
    assert_eq!(updated.sync_status, SyncStatus::Pending);
    assert!(updated.local_updated_at.is_some());
}

#[tokio::test]
async fn test_update_missing_task_exhausts_retries() {
    let (tasks, _) = store().await;

    let err = tasks
        .update_task("local_missing", &UpdateTaskPayload::default(), USER_ID)
        .await
        .unwrap_err();

    match err.downcast_ref::<StorageError>() {
        Some(StorageError::RetryExhausted { id, attempts }) => {
            assert_eq!(id, "local_missing");
            assert_eq!(*attempts, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_backs_off_linearly_before_giving_up() {
    let tasks = patient_store().await;
    let started = Instant::now();

    let err = tasks
        .update_task("local_missing", &UpdateTaskPayload::default(), USER_ID)
        .await
        .unwrap_err();

    // 200 + 400 + 600 ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(1200));
    match err.downcast_ref::<StorageError>() {
        Some(StorageError::RetryExhausted { attempts, .. }) => assert_eq!(*attempts, 4),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_finds_row_written_during_backoff() {
    let tasks = patient_store().await;

    let writer = tasks.clone();
    let late_write = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let row = remote_task("srv-late", "late arrival").to_local_model("local_late", USER_ID);
        writer.bulk_insert_tasks(vec![row], USER_ID).await.unwrap();
    });

    let edit = UpdateTaskPayload {
        title: Some("caught up".to_string()),
        ..Default::default()
    };
    let updated = tasks.update_task("local_late", &edit, USER_ID).await.unwrap();
    late_write.await.unwrap();

    assert_eq!(updated.title, "caught up");
    assert!(updated.needs_sync);
}

#[tokio::test]
async fn test_update_of_foreign_task_is_refused() {
    let (tasks, _) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("mine"), "user-2").await.unwrap();

    let edit = UpdateTaskPayload {
        title: Some("stolen".to_string()),
        ..Default::default()
    };
    assert!(tasks.update_task(&local_id, &edit, USER_ID).await.is_err());
    assert_eq!(tasks.get_task_by_id(&local_id).await.unwrap().title, "mine");
}

#[tokio::test]
async fn test_delete_task_leaves_tombstone() {
    let (tasks, _) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("gone soon"), USER_ID).await.unwrap();

    let deleted = tasks.delete_task(&local_id, USER_ID).await.unwrap();
    assert!(deleted.is_deleted);
    assert!(deleted.needs_sync);

    assert!(tasks.get_all_tasks(USER_ID).await.unwrap().is_empty());
    let err = tasks.get_task_by_id(&local_id).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<StorageError>(), Some(StorageError::NotFound { .. })));

    let tombstone = tasks.find_task(&local_id).await.unwrap().unwrap();
    assert!(tombstone.is_deleted);

    assert!(tasks.permanently_delete_task(&local_id).await.unwrap());
    assert!(tasks.find_task(&local_id).await.unwrap().is_none());
    assert!(!tasks.permanently_delete_task(&local_id).await.unwrap());
}

#[tokio::test]
async fn test_bulk_insert_forces_synced_visible_rows() {
    let (tasks, _) = store().await;
    let mut row = remote_task("srv-7", "from server").to_local_model("local_server_7", "someone-else");
    row.is_deleted = true;
    row.needs_sync = true;

    let inserted = tasks.bulk_insert_tasks(vec![row], USER_ID).await.unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(tasks.bulk_insert_tasks(Vec::new(), USER_ID).await.unwrap(), 0);

    let stored = tasks.get_task_by_id("srv-7").await.unwrap();
    assert_eq!(stored.owner_id, USER_ID);
    assert!(!stored.is_deleted);
    assert!(!stored.needs_sync);
    assert_eq!(stored.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_server_snapshot_never_overwrites_local_edits() {
    let (tasks, _) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("local title"), USER_ID).await.unwrap();
    tasks.update_task_server_id(&local_id, "srv-1").await.unwrap();

    let edit = UpdateTaskPayload {
        title: Some("edited offline".to_string()),
        ..Default::default()
    };
    tasks.update_task(&local_id, &edit, USER_ID).await.unwrap();

    let remote = remote_task("srv-1", "server title");
    assert!(!tasks.apply_server_snapshot(&local_id, &remote).await.unwrap());
    assert_eq!(tasks.get_task_by_id(&local_id).await.unwrap().title, "edited offline");

    tasks.mark_task_as_synced(&local_id).await.unwrap();
    assert!(tasks.apply_server_snapshot(&local_id, &remote).await.unwrap());
    assert_eq!(tasks.get_task_by_id(&local_id).await.unwrap().title, "server title");
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let (tasks, _) = store().await;
    let mut payload = CreateTaskPayload::new("Groceries");
    payload.description = Some("Milk and EGGS".to_string());
    tasks.create_task(&payload, USER_ID).await.unwrap();
    tasks.create_task(&CreateTaskPayload::new("Laundry"), USER_ID).await.unwrap();

    let found = tasks.search_tasks(USER_ID, "eggs").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Groceries");
}

#[tokio::test]
async fn test_search_wildcards_match_literally() {
    let (tasks, _) = store().await;
    tasks.create_task(&CreateTaskPayload::new("Sale: 50% off"), USER_ID).await.unwrap();
    tasks.create_task(&CreateTaskPayload::new("rename_file"), USER_ID).await.unwrap();
    tasks.create_task(&CreateTaskPayload::new("Plain task"), USER_ID).await.unwrap();

    let titles = |found: Vec<tasksync::task::Model>| found.into_iter().map(|t| t.title).collect::<Vec<_>>();
    assert_eq!(titles(tasks.search_tasks(USER_ID, "%").await.unwrap()), vec!["Sale: 50% off"]);
    assert_eq!(titles(tasks.search_tasks(USER_ID, "_").await.unwrap()), vec!["rename_file"]);
    assert!(tasks.search_tasks(USER_ID, "50_ off").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_owner_flags_row_for_sync() {
    let (tasks, _) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("guest task"), "guest").await.unwrap();
    tasks.mark_task_as_synced(&local_id).await.unwrap();

    tasks.update_task_owner(&local_id, USER_ID).await.unwrap();

    let task = tasks.get_task_by_id(&local_id).await.unwrap();
    assert_eq!(task.owner_id, USER_ID);
    assert!(task.needs_sync);
    assert_eq!(tasks.get_tasks_needing_sync(USER_ID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_clear_all_data() {
    let (tasks, queue) = store().await;
    let local_id = tasks.create_task(&CreateTaskPayload::new("x"), USER_ID).await.unwrap();
    queue
        .add_to_queue(
            &tasksync::payload::OperationPayload::Delete,
            tasksync::entities::sync_operation::EntityKind::Task,
            &local_id,
        )
        .await
        .unwrap();

    tasks.clear_all_data().await.unwrap();

    assert!(tasks.find_task(&local_id).await.unwrap().is_none());
    assert!(queue.get_all_operations().await.unwrap().is_empty());
}
