//! Task definitions for the microtask queue.
//!
//! A task is a one-shot callable plus the bookkeeping the queue needs to run
//! it: an id for logs, an optional name, and an optional execution context.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::runtime::value::Value;

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> Self {
        Self(val)
    }
}

impl From<TaskId> for usize {
    fn from(val: TaskId) -> Self {
        val.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Ambient error-handling context re-established around a deferred task.
///
/// The context is entered right before the task runs and exited after it
/// returns normally. When the task fails the context is left entered so
/// that whoever handles the uncaught error still observes it.
pub trait ExecutionContext: fmt::Debug {
    fn enter(&self);
    fn exit(&self);
}

/// A task that failed while the queue was draining.
#[derive(Debug, Clone, Error)]
#[error("uncaught exception in {task}: {thrown}")]
pub struct TaskError {
    /// Task that threw.
    pub task: TaskId,
    /// The thrown value.
    pub thrown: Value,
}

type Executor = Box<dyn FnOnce() -> Result<(), Value>>;

/// A one-shot unit of deferred work.
pub struct Task {
    /// Unique task ID.
    id: TaskId,
    /// Task name for debugging.
    name: Option<String>,
    /// Context restored around execution.
    context: Option<Rc<dyn ExecutionContext>>,
    /// The actual work to execute.
    executor: Executor,
}

impl fmt::Debug for Task {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("context", &self.context)
            .finish()
    }
}

impl Task {
    /// Create a new task with the given ID and executor.
    pub fn new<F>(
        id: TaskId,
        executor: F,
    ) -> Self
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        TaskBuilder::new().build(id, executor)
    }

    /// Get the task ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the task name, if one was given.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the execution context.
    #[inline]
    pub fn context(&self) -> Option<&Rc<dyn ExecutionContext>> {
        self.context.as_ref()
    }

    /// Attach a context if the task does not carry one yet.
    pub(crate) fn inherit_context(
        &mut self,
        context: Option<Rc<dyn ExecutionContext>>,
    ) {
        if self.context.is_none() {
            self.context = context;
        }
    }

    /// Run the task, consuming it.
    pub fn run(self) -> Result<(), TaskError> {
        let Task {
            id,
            context,
            executor,
            ..
        } = self;

        if let Some(context) = &context {
            context.enter();
        }

        match executor() {
            Ok(()) => {
                if let Some(context) = &context {
                    context.exit();
                }
                Ok(())
            }
            Err(thrown) => {
                trace!(task = %id, thrown = %thrown, "task threw");
                Err(TaskError { task: id, thrown })
            }
        }
    }
}

/// Task builder for constructing tasks with various options.
#[derive(Debug, Default)]
pub struct TaskBuilder {
    name: Option<String>,
    context: Option<Rc<dyn ExecutionContext>>,
}

impl TaskBuilder {
    /// Create a new task builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the task name.
    #[inline]
    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the execution context.
    #[inline]
    pub fn context(
        mut self,
        context: Rc<dyn ExecutionContext>,
    ) -> Self {
        self.context = Some(context);
        self
    }

    /// Build the task with the given ID and executor.
    pub fn build<F>(
        self,
        id: TaskId,
        executor: F,
    ) -> Task
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        Task {
            id,
            name: self.name,
            context: self.context,
            executor: Box::new(executor),
        }
    }
}

/// Iterator for generating task IDs.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next_id: usize,
}

impl TaskIdGenerator {
    /// Create a new task ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the next task ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        TaskId(id)
    }
}
