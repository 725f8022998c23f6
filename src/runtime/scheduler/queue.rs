//! Microtask queue
//!
//! A FIFO list of tasks plus a cursor marking the next unexecuted entry.
//! Tasks enqueued while the queue drains extend the same list and run in the
//! same pass. Executed entries are not shifted off one by one: every time the
//! cursor passes `capacity` the executed prefix is discarded in bulk.
//!
//! A task that fails interrupts the drain. The cursor has already moved past
//! it, so the next `flush` resumes with the following task; the queue asks
//! the host for that next flush before returning the error.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::host::Host;
use super::task::{ExecutionContext, Task, TaskBuilder, TaskError, TaskId, TaskIdGenerator};
use super::QueueConfig;
use crate::runtime::value::Value;

struct QueueState {
    /// Task slots; `None` once executed.
    tasks: Vec<Option<Task>>,
    /// Next slot to execute.
    index: usize,
    /// A flush was requested and has not completed yet.
    flushing: bool,
    /// Executed entries tolerated before compaction.
    capacity: usize,
    ids: TaskIdGenerator,
    /// Context inherited by tasks enqueued from now on.
    active_context: Option<Rc<dyn ExecutionContext>>,
}

/// Handle to a microtask queue.
///
/// Clones share the same queue. The queue is injected into every realm, so
/// separate queues give fully isolated promise worlds.
#[derive(Clone)]
pub struct MicrotaskQueue {
    state: Rc<RefCell<QueueState>>,
    host: Rc<dyn Host>,
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MicrotaskQueue")
            .field("len", &(state.tasks.len() - state.index))
            .field("index", &state.index)
            .field("flushing", &state.flushing)
            .field("capacity", &state.capacity)
            .finish()
    }
}

impl MicrotaskQueue {
    /// Create a queue with the default configuration.
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self::with_config(host, &QueueConfig::default())
    }

    /// Create a queue with a custom configuration.
    pub fn with_config(
        host: Rc<dyn Host>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(QueueState {
                tasks: Vec::new(),
                index: 0,
                flushing: false,
                capacity: config.capacity.max(1),
                ids: TaskIdGenerator::new(),
                active_context: None,
            })),
            host,
        }
    }

    /// The host this queue requests flushes from.
    #[inline]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Allocate a fresh task id.
    pub fn next_task_id(&self) -> TaskId {
        self.state.borrow_mut().ids.next()
    }

    /// Set the context inherited by subsequently enqueued tasks.
    pub fn set_active_context(
        &self,
        context: Option<Rc<dyn ExecutionContext>>,
    ) {
        self.state.borrow_mut().active_context = context;
    }

    /// Enqueue a closure as a microtask.
    pub fn enqueue<F>(
        &self,
        executor: F,
    ) -> TaskId
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        let id = self.next_task_id();
        self.enqueue_task(Task::new(id, executor));
        id
    }

    /// Enqueue a prebuilt task.
    ///
    /// Requests a flush from the host only if the queue was empty.
    pub fn enqueue_task(
        &self,
        mut task: Task,
    ) {
        let needs_flush = {
            let mut state = self.state.borrow_mut();
            task.inherit_context(state.active_context.clone());
            let needs_flush = state.tasks.is_empty();
            if needs_flush {
                state.flushing = true;
            }
            trace!(task = %task.id(), pending = state.tasks.len() - state.index + 1, "enqueue");
            state.tasks.push(Some(task));
            needs_flush
        };

        if needs_flush {
            self.host.request_flush();
        }
    }

    /// Schedule a closure as a host macrotask.
    pub fn set_timeout<F>(
        &self,
        executor: F,
    ) -> TaskId
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        let id = self.next_task_id();
        let task = match self.state.borrow().active_context.clone() {
            Some(context) => TaskBuilder::new().context(context).build(id, executor),
            None => TaskBuilder::new().build(id, executor),
        };
        self.host.set_timeout(task);
        id
    }

    /// Ask the host for another flush.
    pub fn request_flush(&self) {
        self.state.borrow_mut().flushing = true;
        self.host.request_flush();
    }

    /// Execute queued tasks until the list is exhausted or a task fails.
    ///
    /// Returns the number of tasks executed by this call.
    pub fn flush(&self) -> Result<usize, TaskError> {
        let mut executed = 0;

        loop {
            let task = {
                let mut state = self.state.borrow_mut();
                if state.index >= state.tasks.len() {
                    break;
                }
                let current = state.index;
                // Advance before running so a failing task is not re-run.
                state.index += 1;
                state.tasks[current].take()
            };

            if let Some(task) = task {
                executed += 1;
                if let Err(error) = task.run() {
                    debug!(task = %error.task, "flush interrupted, requesting resume");
                    self.request_flush();
                    return Err(error);
                }
            }

            let mut state = self.state.borrow_mut();
            if state.index > state.capacity {
                let index = state.index;
                state.tasks.drain(..index);
                state.index = 0;
                debug!(discarded = index, remaining = state.tasks.len(), "compacted queue");
            }
        }

        let mut state = self.state.borrow_mut();
        state.tasks.clear();
        state.index = 0;
        state.flushing = false;
        trace!(executed, "flush complete");
        Ok(executed)
    }

    /// Drop every queued task and return to the idle state.
    pub fn reset(&self) {
        let dropped = {
            let mut state = self.state.borrow_mut();
            state.index = 0;
            state.flushing = false;
            std::mem::take(&mut state.tasks)
        };
        // Dropping tasks may release promises; keep the state unborrowed.
        drop(dropped);
    }

    /// Number of tasks waiting to run.
    #[inline]
    pub fn len(&self) -> usize {
        let state = self.state.borrow();
        state.tasks.len() - state.index
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a flush was requested and has not completed.
    #[inline]
    pub fn is_flush_pending(&self) -> bool {
        self.state.borrow().flushing
    }

    /// Number of slots currently held, executed or not.
    #[inline]
    pub fn slots(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.state.borrow().capacity
    }
}
