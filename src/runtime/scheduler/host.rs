//! Host platform services consumed by the queue.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use super::task::{Task, TaskError};

/// The platform's deferred-execution facility.
///
/// `request_flush` asks for the microtask queue to be flushed on a later
/// turn, ahead of any other pending work. `set_timeout` schedules a
/// macrotask that runs only once microtasks are drained.
pub trait Host {
    fn request_flush(&self);
    fn set_timeout(
        &self,
        task: Task,
    );
}

/// A host that only records what was asked of it.
///
/// Useful when the embedder drives flushing by hand, and in tests.
#[derive(Debug, Default)]
pub struct ManualHost {
    flush_requests: Cell<usize>,
    timeouts: RefCell<VecDeque<Task>>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flush requests received so far.
    #[inline]
    pub fn flush_requests(&self) -> usize {
        self.flush_requests.get()
    }

    /// Number of macrotasks waiting.
    #[inline]
    pub fn pending_timeouts(&self) -> usize {
        self.timeouts.borrow().len()
    }

    /// Run every queued macrotask, including those scheduled while running,
    /// collecting the failures.
    pub fn run_timeouts(&self) -> Vec<TaskError> {
        let mut errors = Vec::new();
        loop {
            let next = self.timeouts.borrow_mut().pop_front();
            let Some(task) = next else { break };
            if let Err(error) = task.run() {
                errors.push(error);
            }
        }
        errors
    }
}

impl Host for ManualHost {
    fn request_flush(&self) {
        self.flush_requests.set(self.flush_requests.get() + 1);
    }

    fn set_timeout(
        &self,
        task: Task,
    ) {
        self.timeouts.borrow_mut().push_back(task);
    }
}
