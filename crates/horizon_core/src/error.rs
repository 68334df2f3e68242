//! # Core Error Types

use thiserror::Error;

/// Errors raised while setting up the task queue.
#[derive(Error, Debug)]
pub enum TaskQueueError {
    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    SpawnFailed {
        /// Name of the worker that could not start.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// A background producer panicked instead of returning its result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("background task panicked: {message}")]
pub struct TaskPanicked {
    /// Panic payload, when it was a string.
    pub message: String,
}

/// Result type for task queue operations.
pub type TaskQueueResult<T> = Result<T, TaskQueueError>;
