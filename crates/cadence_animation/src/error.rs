//! Scheduler error types

use thiserror::Error;

/// Scheduler-related errors
///
/// Animation and interpolation operations never fail; only bringing up the
/// background worker can.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The OS refused to spawn the worker thread
    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
