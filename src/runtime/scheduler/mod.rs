//! Microtask scheduling
//!
//! This module provides the [`MicrotaskQueue`] that promise continuations
//! run on, the [`Host`] trait through which the queue asks for flushes, and
//! a small [`EventLoop`] host.

pub mod event_loop;
pub mod host;
pub mod queue;
pub mod task;

pub use event_loop::EventLoop;
pub use host::{Host, ManualHost};
pub use queue::MicrotaskQueue;
pub use task::{ExecutionContext, Task, TaskBuilder, TaskError, TaskId, TaskIdGenerator};

use serde::{Deserialize, Serialize};

/// Default number of executed entries kept before compaction.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Executed entries tolerated before the queue is compacted.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests;
