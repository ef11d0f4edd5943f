pub mod sync_operation;
pub mod task;

pub use sync_operation::Entity as SyncOperation;
pub use task::Entity as Task;
