//! Utility modules for tasksync.
//!
//! - [`datetime`] - Timestamps, day boundaries and local id generation

pub mod datetime;
