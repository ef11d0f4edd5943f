//! Sync queue repository for database operations.

use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::sync_operation::{self, OperationStatus};

/// Repository for queue-related database operations.
pub struct SyncOperationRepository;

impl SyncOperationRepository {
    /// Append an operation, returning its id.
    pub async fn insert<C>(conn: &C, operation: sync_operation::ActiveModel) -> Result<i32>
    where
        C: ConnectionTrait,
    {
        let result = sync_operation::Entity::insert(operation).exec(conn).await?;
        Ok(result.last_insert_id)
    }

    /// Get a single operation by id.
    pub async fn get_by_id<C>(conn: &C, id: i32) -> Result<Option<sync_operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find_by_id(id).one(conn).await?)
    }

    /// Get operations in one state, in consumption order.
    pub async fn get_by_status<C>(conn: &C, status: OperationStatus) -> Result<Vec<sync_operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find()
            .filter(sync_operation::Column::Status.eq(status))
            .order_by_asc(sync_operation::Column::CreatedAt)
            .order_by_asc(sync_operation::Column::Id)
            .all(conn)
            .await?)
    }

    /// Get every stored operation in consumption order.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<sync_operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find()
            .order_by_asc(sync_operation::Column::CreatedAt)
            .order_by_asc(sync_operation::Column::Id)
            .all(conn)
            .await?)
    }

    /// Get outstanding operations for one entity.
    pub async fn get_for_entity<C>(conn: &C, entity_id: &str) -> Result<Vec<sync_operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find()
            .filter(sync_operation::Column::EntityId.eq(entity_id))
            .order_by_asc(sync_operation::Column::CreatedAt)
            .order_by_asc(sync_operation::Column::Id)
            .all(conn)
            .await?)
    }

    /// Distinct entity ids with at least one stored operation.
    pub async fn get_entity_ids<C>(conn: &C) -> Result<Vec<String>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find()
            .select_only()
            .column(sync_operation::Column::EntityId)
            .distinct()
            .into_tuple::<String>()
            .all(conn)
            .await?)
    }

    /// Update an operation row.
    pub async fn update<C>(conn: &C, operation: sync_operation::ActiveModel) -> Result<sync_operation::Model>
    where
        C: ConnectionTrait,
    {
        use sea_orm::ActiveModelTrait;
        Ok(operation.update(conn).await?)
    }

    /// Delete one operation. Returns rows removed.
    pub async fn delete_by_id<C>(conn: &C, id: i32) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::delete_by_id(id).exec(conn).await?.rows_affected)
    }

    /// Delete every operation in one state. Returns rows removed.
    pub async fn delete_by_status<C>(conn: &C, status: OperationStatus) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::delete_many()
            .filter(sync_operation::Column::Status.eq(status))
            .exec(conn)
            .await?
            .rows_affected)
    }

    /// Move failed operations back to pending with a fresh retry budget.
    ///
    /// Limited to one operation when `id` is given. Returns rows reset.
    pub async fn reset_failed<C>(conn: &C, id: Option<i32>) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        let mut update = sync_operation::Entity::update_many()
            .col_expr(sync_operation::Column::Status, Expr::value(OperationStatus::Pending))
            .col_expr(sync_operation::Column::RetryCount, Expr::value(0))
            .filter(sync_operation::Column::Status.eq(OperationStatus::Failed));
        if let Some(id) = id {
            update = update.filter(sync_operation::Column::Id.eq(id));
        }
        Ok(update.exec(conn).await?.rows_affected)
    }

    /// Count operations in one state.
    pub async fn count_by_status<C>(conn: &C, status: OperationStatus) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::find()
            .filter(sync_operation::Column::Status.eq(status))
            .count(conn)
            .await?)
    }

    /// Remove all operations.
    pub async fn delete_all<C>(conn: &C) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(sync_operation::Entity::delete_many().exec(conn).await?.rows_affected)
    }
}
