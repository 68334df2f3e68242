//! # Synchronization
//!
//! Moving work off the update loop and back again.

pub mod task_queue;

pub use task_queue::{QueueStats, TaskQueue, TaskQueueConfig};
