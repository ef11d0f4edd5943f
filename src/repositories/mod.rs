//! Repository layer for database operations.
//!
//! This module provides repository structs that encapsulate database queries
//! and operations, following the Data Mapper pattern recommended by SeaORM.
//! Repositories keep entities as pure data models while providing reusable
//! database access methods. They are generic over `ConnectionTrait` so the
//! same query runs on a plain connection or inside a transaction.

pub mod sync_operation;
pub mod task;

pub use sync_operation::SyncOperationRepository;
pub use task::TaskRepository;
