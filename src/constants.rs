//! Constants used throughout the crate
//!
//! This module centralizes default values, identifiers and log message
//! prefixes so the store, queue and processor agree on them.

// Identity
/// Owner id used for tasks created in a local-only guest session
pub const GUEST_USER_ID: &str = "GUEST_USER_LOCAL";
/// Prefix of client-generated task identities
pub const LOCAL_ID_PREFIX: &str = "local_";

// Queue defaults
/// Failures allowed before an operation is parked as `failed`
pub const DEFAULT_MAX_RETRIES: i32 = 3;

// Store defaults
/// Pause after each serialized store operation before the next one starts
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
/// Extra existence checks performed by `update_task` before giving up
pub const DEFAULT_UPDATE_RETRY_ATTEMPTS: u32 = 3;
/// Backoff unit for `update_task` retries (multiplied by the attempt number)
pub const DEFAULT_UPDATE_RETRY_BACKOFF_MS: u64 = 200;

// Processor defaults
/// Seconds between periodic processor passes
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
/// Delay before each remote call
pub const DEFAULT_PACING_BEFORE_MS: u64 = 100;
/// Delay after each successfully applied operation
pub const DEFAULT_PACING_AFTER_MS: u64 = 200;
/// Upper bound accepted by config validation for the sync interval (24 hours)
pub const MAX_SYNC_INTERVAL_SECS: u64 = 86_400;
/// Upper bound accepted by config validation for any millisecond delay
pub const MAX_DELAY_MS: u64 = 60_000;
/// Page size used when a caller asks for zero
pub const DEFAULT_PAGE_SIZE: usize = 20;

// Conflict detection
/// Two edits this close together are treated as concurrent
pub const CONFLICT_WINDOW_SECS: i64 = 60;

// Text merge
/// Context characters kept around each patch hunk when relocating it
pub const PATCH_MARGIN: usize = 4;
/// Texts longer than this are not merged; the local value is kept
pub const MAX_MERGE_CHARS: usize = 100_000;
/// Above this many DP cells the diff degrades to a single hunk
pub const MAX_DIFF_CELLS: usize = 4_000_000;

// File names
pub const APP_DIR_NAME: &str = "tasksync";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCAL_CONFIG_FILE_NAME: &str = "tasksync.toml";
pub const DATABASE_FILE_NAME: &str = "tasksync.db";
pub const LOG_FILE_NAME: &str = "tasksync.log";

// Messages
pub const CONFIG_GENERATED: &str = "✅ Generated default configuration file";
pub const ERROR_NO_SESSION: &str = "No active session";
pub const ERROR_NO_ACCESS_TOKEN: &str = "Signed-in session with an access token required";
pub const ERROR_OFFLINE: &str = "Device is offline";
