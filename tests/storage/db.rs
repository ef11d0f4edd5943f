use tasksync::config::StorageConfig;
use tasksync::storage::LocalStorage;

#[tokio::test]
async fn test_local_storage_creation() {
    // In-memory database for tests
    let result = LocalStorage::in_memory().await;
    assert!(result.is_ok(), "LocalStorage should be created successfully");
}

#[tokio::test]
async fn test_open_in_memory_from_config() {
    let config = StorageConfig {
        in_memory: true,
        ..Default::default()
    };
    assert!(LocalStorage::open(&config).await.is_ok());
}

#[tokio::test]
async fn test_open_file_database_creates_parent_dirs() {
    let dir = std::env::temp_dir().join(format!("tasksync-test-{}", uuid::Uuid::new_v4().simple()));
    let path = dir.join("nested").join("tasks.db");
    let config = StorageConfig {
        database_path: path.display().to_string(),
        ..Default::default()
    };

    {
        let storage = LocalStorage::open(&config).await.unwrap();
        drop(storage);
    }
    assert!(path.exists());

    // Reopening an existing file keeps the schema creation idempotent
    assert!(LocalStorage::open(&config).await.is_ok());

    let _ = std::fs::remove_dir_all(&dir);
}
