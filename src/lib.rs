//! Tasksync - offline-first task storage with a durable sync queue
//!
//! This library keeps a user's tasks in a local SQLite database, records every
//! mutation as an operation in a persistent queue, and replays that queue
//! against a remote task service whenever a session and connectivity allow.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`config`] - Application configuration management
//! * [`storage`] - Local database, task store and sync queue
//! * [`sync`] - Sync service, background processor and conflict handling
//! * [`remote`] - Remote task service contract and wire models
//! * [`session`] / [`network`] - Collaborator seams the service depends on
//! * [`utils`] - Utility functions and helpers

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for database tables
pub mod entities;

/// Logging setup on top of `log` and `fern`
pub mod logger;

/// Connectivity reporting
pub mod network;

/// Queued operation payloads
pub mod payload;

/// Remote task service contract
pub mod remote;

/// Repository layer for database operations
pub mod repositories;

/// Current user session
pub mod session;

/// Local storage layer: task store and durable operation queue
pub mod storage;

/// Synchronization engine for keeping local and remote data in sync
pub mod sync;

/// Utility functions for date/time handling and other helpers
pub mod utils;

// Re-export entity models for convenient access
pub use entities::{sync_operation, task};
