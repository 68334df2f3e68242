//! # HORIZON Core
//!
//! Engine plumbing shared by the generation crates.
//!
//! ## Modules
//!
//! - `sync`: the task queue that moves work onto background workers and
//!   hands results back to the single-threaded update loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use horizon_core::{TaskQueue, TaskQueueConfig};
//!
//! let mut queue: TaskQueue<Vec<u64>> = TaskQueue::new(TaskQueueConfig::default())?;
//! queue.submit(|| 6u64 * 7, |answer, results: &mut Vec<u64>| {
//!     if let Ok(answer) = answer {
//!         results.push(answer);
//!     }
//! });
//!
//! // Later, on the update loop:
//! let mut results = Vec::new();
//! queue.poll(&mut results);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod sync;

pub use error::{TaskPanicked, TaskQueueError, TaskQueueResult};
pub use sync::{QueueStats, TaskQueue, TaskQueueConfig};
