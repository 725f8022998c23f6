//! A minimal host event loop.
//!
//! Each turn either flushes the microtask queue (when a flush was requested)
//! or runs a single macrotask. Microtasks therefore always take priority
//! over timeouts. Uncaught task errors go to the installed handler; without
//! one they are returned to the caller and the loop stays resumable.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error};

use super::host::Host;
use super::queue::MicrotaskQueue;
use super::task::{Task, TaskError};
use super::QueueConfig;

#[derive(Debug, Default)]
struct LoopState {
    flush_requested: Cell<bool>,
    macrotasks: RefCell<VecDeque<Task>>,
}

impl Host for LoopState {
    fn request_flush(&self) {
        self.flush_requested.set(true);
    }

    fn set_timeout(
        &self,
        task: Task,
    ) {
        self.macrotasks.borrow_mut().push_back(task);
    }
}

type UncaughtHandler = Box<dyn FnMut(&TaskError)>;

/// Single-threaded event loop owning a microtask queue.
pub struct EventLoop {
    queue: MicrotaskQueue,
    state: Rc<LoopState>,
    uncaught: Option<UncaughtHandler>,
    turns: u64,
}

impl fmt::Debug for EventLoop {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("queue", &self.queue)
            .field("macrotasks", &self.state.macrotasks.borrow().len())
            .field("turns", &self.turns)
            .finish()
    }
}

impl EventLoop {
    /// Create an event loop with the default queue configuration.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(&QueueConfig::default())
    }

    /// Create an event loop with a custom queue configuration.
    pub fn with_config(config: &QueueConfig) -> Self {
        let state = Rc::new(LoopState::default());
        let host: Rc<dyn Host> = state.clone();
        Self {
            queue: MicrotaskQueue::with_config(host, config),
            state,
            uncaught: None,
            turns: 0,
        }
    }

    /// The loop's microtask queue.
    #[inline]
    pub fn queue(&self) -> &MicrotaskQueue {
        &self.queue
    }

    /// Install the top-level handler for uncaught task errors.
    pub fn on_uncaught<F>(
        &mut self,
        handler: F,
    ) where
        F: FnMut(&TaskError) + 'static,
    {
        self.uncaught = Some(Box::new(handler));
    }

    /// Number of turns that ran something.
    #[inline]
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Whether a flush or a macrotask is waiting.
    pub fn has_pending_work(&self) -> bool {
        self.state.flush_requested.get() || !self.state.macrotasks.borrow().is_empty()
    }

    /// Run one turn. Returns `Ok(false)` when there was nothing to do.
    pub fn turn(&mut self) -> Result<bool, TaskError> {
        if self.state.flush_requested.replace(false) {
            self.turns += 1;
            let result = self.queue.flush().map(|_| ());
            self.dispatch(result)?;
            return Ok(true);
        }

        let next = self.state.macrotasks.borrow_mut().pop_front();
        match next {
            Some(task) => {
                self.turns += 1;
                self.dispatch(task.run())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run turns until no work is left.
    ///
    /// Returns the number of turns run by this call.
    pub fn run_until_idle(&mut self) -> Result<usize, TaskError> {
        let mut turns = 0;
        while self.turn()? {
            turns += 1;
        }
        Ok(turns)
    }

    fn dispatch(
        &mut self,
        result: Result<(), TaskError>,
    ) -> Result<(), TaskError> {
        let Err(err) = result else {
            return Ok(());
        };
        match &mut self.uncaught {
            Some(handler) => {
                debug!(task = %err.task, "routing uncaught error to handler");
                handler(&err);
                Ok(())
            }
            None => {
                error!("{}", err);
                Err(err)
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
