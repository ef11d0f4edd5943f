use anyhow::{Context, Result};
use log::info;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;

use crate::config::StorageConfig;
use crate::entities::{sync_operation, task};

/// Connections are never recycled: an in-memory database lives exactly as
/// long as its single connection.
const CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Local SQLite database holding tasks and the outbound queue
pub struct LocalStorage {
    pub conn: DatabaseConnection,
}

impl LocalStorage {
    /// Connect to `database_url` and create the schema if needed
    pub async fn new(database_url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(CONNECTION_LIFETIME)
            .max_lifetime(CONNECTION_LIFETIME)
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .with_context(|| format!("Failed to open database {}", database_url))?;

        let storage = LocalStorage { conn };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Throwaway database that disappears with the process
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Open the database described by the storage configuration
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        if config.in_memory {
            return Self::in_memory().await;
        }

        let path = config.resolve_database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }
        info!("💾 Opening database at {}", path.display());
        Self::new(&format!("sqlite://{}?mode=rwc", path.display())).await
    }

    /// Create tables and indexes from the entity definitions
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut tasks = schema.create_table_from_entity(task::Entity);
        self.conn.execute(backend.build(tasks.if_not_exists())).await?;

        let mut queue = schema.create_table_from_entity(sync_operation::Entity);
        self.conn.execute(backend.build(queue.if_not_exists())).await?;

        let indexes = [
            Index::create()
                .if_not_exists()
                .name("idx_tasks_owner_id")
                .table(task::Entity)
                .col(task::Column::OwnerId)
                .to_owned(),
            Index::create()
                .if_not_exists()
                .name("idx_tasks_needs_sync")
                .table(task::Entity)
                .col(task::Column::NeedsSync)
                .to_owned(),
            Index::create()
                .if_not_exists()
                .name("idx_sync_queue_status")
                .table(sync_operation::Entity)
                .col(sync_operation::Column::Status)
                .col(sync_operation::Column::CreatedAt)
                .to_owned(),
        ];
        for index in &indexes {
            self.conn.execute(backend.build(index)).await?;
        }

        Ok(())
    }
}
