//! Task repository for database operations.

use anyhow::Result;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::task;

/// Repository for task-related database operations.
pub struct TaskRepository;

impl TaskRepository {
    /// Condition matching a task by either of its identities.
    fn id_condition(id: &str) -> Condition {
        Condition::any()
            .add(task::Column::LocalId.eq(id))
            .add(task::Column::ServerId.eq(id))
    }

    /// Get visible tasks for an owner, newest created first.
    pub async fn get_for_owner<C>(conn: &C, owner_id: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::OwnerId.eq(owner_id))
            .filter(task::Column::IsDeleted.eq(false))
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::LocalId)
            .all(conn)
            .await?)
    }

    /// Get every row for an owner, tombstones included.
    pub async fn get_all_rows_for_owner<C>(conn: &C, owner_id: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::OwnerId.eq(owner_id))
            .order_by_asc(task::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Get a visible task by local or server id.
    pub async fn get_by_id<C>(conn: &C, id: &str) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(Self::id_condition(id))
            .filter(task::Column::IsDeleted.eq(false))
            .one(conn)
            .await?)
    }

    /// Get a visible task by local or server id, restricted to one owner.
    pub async fn get_by_id_for_owner<C>(conn: &C, id: &str, owner_id: &str) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(Self::id_condition(id))
            .filter(task::Column::OwnerId.eq(owner_id))
            .filter(task::Column::IsDeleted.eq(false))
            .one(conn)
            .await?)
    }

    /// Get a task by local or server id, tombstones included.
    pub async fn find_any<C>(conn: &C, id: &str) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find().filter(Self::id_condition(id)).one(conn).await?)
    }

    /// Get rows with local changes not yet pushed, oldest change first.
    pub async fn get_needing_sync<C>(conn: &C, owner_id: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::OwnerId.eq(owner_id))
            .filter(task::Column::NeedsSync.eq(true))
            .order_by_asc(task::Column::UpdatedAt)
            .all(conn)
            .await?)
    }

    /// Case-insensitive substring search over title and description.
    ///
    /// `%` and `_` in `query` match themselves.
    pub async fn search<C>(conn: &C, owner_id: &str, query: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        let mut escaped = String::with_capacity(query.len());
        for c in query.to_lowercase().chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        let pattern = || LikeExpr::new(format!("%{escaped}%")).escape('\\');
        Ok(task::Entity::find()
            .filter(task::Column::OwnerId.eq(owner_id))
            .filter(task::Column::IsDeleted.eq(false))
            .filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(task::Column::Title))).like(pattern()))
                    .add(Expr::expr(Func::lower(Expr::col(task::Column::Description))).like(pattern())),
            )
            .order_by_desc(task::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Insert a new task row.
    pub async fn insert<C>(conn: &C, task: task::ActiveModel) -> Result<()>
    where
        C: ConnectionTrait,
    {
        task::Entity::insert(task).exec_without_returning(conn).await?;
        Ok(())
    }

    /// Update a task in the database.
    pub async fn update<C>(conn: &C, task: task::ActiveModel) -> Result<task::Model>
    where
        C: ConnectionTrait,
    {
        use sea_orm::ActiveModelTrait;
        Ok(task.update(conn).await?)
    }

    /// Insert or refresh rows keyed by local id.
    pub async fn upsert_many<C>(conn: &C, tasks: Vec<task::ActiveModel>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if tasks.is_empty() {
            return Ok(());
        }

        task::Entity::insert_many(tasks)
            .on_conflict(
                OnConflict::column(task::Column::LocalId)
                    .update_columns([
                        task::Column::ServerId,
                        task::Column::Title,
                        task::Column::Description,
                        task::Column::Status,
                        task::Column::Priority,
                        task::Column::DueDate,
                        task::Column::Tags,
                        task::Column::ImagePath,
                        task::Column::ImageUrl,
                        task::Column::OwnerId,
                        task::Column::UpdatedAt,
                        task::Column::LocalUpdatedAt,
                        task::Column::SyncStatus,
                        task::Column::IsDeleted,
                        task::Column::NeedsSync,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// Hard delete one row by local or server id. Returns rows removed.
    pub async fn delete_by_id<C>(conn: &C, id: &str) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::delete_many()
            .filter(Self::id_condition(id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    /// Hard delete every row owned by `owner_id`. Returns rows removed.
    pub async fn delete_for_owner<C>(conn: &C, owner_id: &str) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::delete_many()
            .filter(task::Column::OwnerId.eq(owner_id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    /// Remove all task rows.
    pub async fn delete_all<C>(conn: &C) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::delete_many().exec(conn).await?.rows_affected)
    }
}
