use tasksync::entities::sync_operation::{EntityKind, OperationStatus, OperationType};
use tasksync::payload::{CreateTaskPayload, OperationPayload};

use crate::common::{store, MAX_RETRIES};

fn create(title: &str) -> OperationPayload {
    OperationPayload::Create(CreateTaskPayload::new(title))
}

#[tokio::test]
async fn test_pending_operations_come_back_in_insertion_order() {
    let (_, queue) = store().await;

    let a = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();
    let b = queue.add_to_queue(&OperationPayload::Delete, EntityKind::Task, "local_a").await.unwrap();
    let c = queue.add_to_queue(&create("c"), EntityKind::Task, "local_c").await.unwrap();

    let pending = queue.get_pending_operations().await.unwrap();
    let ids: Vec<i32> = pending.iter().map(|op| op.id).collect();
    assert_eq!(ids, vec![a, b, c]);

    assert_eq!(pending[0].operation_type, OperationType::Create);
    assert_eq!(pending[1].operation_type, OperationType::Delete);
    assert_eq!(pending[1].payload, None);
    assert!(pending.iter().all(|op| op.retry_count == 0 && op.max_retries == MAX_RETRIES));
}

#[tokio::test]
async fn test_mark_completed_removes_and_is_idempotent() {
    let (_, queue) = store().await;
    let id = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();

    queue.mark_operation_completed(id).await.unwrap();
    queue.mark_operation_completed(id).await.unwrap();

    assert!(queue.get_operation(id).await.unwrap().is_none());
    let stats = queue.get_queue_stats().await.unwrap();
    assert_eq!((stats.pending, stats.completed, stats.failed), (0, 0, 0));
}

#[tokio::test]
async fn test_operation_fails_exactly_at_max_retries() {
    let (_, queue) = store().await;
    let id = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();

    for _ in 0..MAX_RETRIES - 1 {
        let status = queue.increment_retry_count(id).await.unwrap();
        assert_eq!(status, Some(OperationStatus::Pending));
    }
    let status = queue.increment_retry_count(id).await.unwrap();
    assert_eq!(status, Some(OperationStatus::Failed));

    let op = queue.get_operation(id).await.unwrap().unwrap();
    assert_eq!(op.retry_count, MAX_RETRIES);
    assert!(op.is_failed());
    assert!(queue.get_pending_operations().await.unwrap().is_empty());
    assert_eq!(queue.get_failed_operations().await.unwrap().len(), 1);

    assert_eq!(queue.increment_retry_count(9999).await.unwrap(), None);
}

#[tokio::test]
async fn test_reset_only_touches_failed_operations() {
    let (_, queue) = store().await;
    let failed = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();
    let pending = queue.add_to_queue(&create("b"), EntityKind::Task, "local_b").await.unwrap();
    queue.mark_operation_failed(failed).await.unwrap();
    queue.increment_retry_count(pending).await.unwrap();

    assert_eq!(queue.reset_failed_operation(pending).await.unwrap(), 0);
    assert_eq!(queue.get_operation(pending).await.unwrap().unwrap().retry_count, 1);

    assert_eq!(queue.reset_all_failed_operations().await.unwrap(), 1);
    let reset = queue.get_operation(failed).await.unwrap().unwrap();
    assert_eq!(reset.status, OperationStatus::Pending);
    assert_eq!(reset.retry_count, 0);

    assert_eq!(queue.reset_all_failed_operations().await.unwrap(), 0);
}

#[tokio::test]
async fn test_clear_failed_and_remove_operation() {
    let (_, queue) = store().await;
    let failed = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();
    let kept = queue.add_to_queue(&create("b"), EntityKind::Task, "local_b").await.unwrap();
    queue.mark_operation_failed(failed).await.unwrap();

    assert_eq!(queue.clear_completed_operations().await.unwrap(), 0);
    assert_eq!(queue.clear_failed_operations().await.unwrap(), 1);

    let status = queue.get_real_queue_status().await.unwrap();
    assert_eq!((status.pending, status.failed, status.total), (1, 0, 1));

    assert!(queue.remove_operation(kept).await.unwrap());
    assert!(!queue.remove_operation(kept).await.unwrap());
}

#[tokio::test]
async fn test_operations_for_entity_include_failed() {
    let (_, queue) = store().await;
    let create_id = queue.add_to_queue(&create("a"), EntityKind::Task, "local_a").await.unwrap();
    queue.add_to_queue(&create("b"), EntityKind::Task, "local_b").await.unwrap();
    queue.mark_operation_failed(create_id).await.unwrap();

    let ops = queue.get_operations_for_entity("local_a").await.unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].id, create_id);
}
