//! Scheduler 单元测试
//!
//! 测试任务、微任务队列和事件循环


use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::runtime::scheduler::{ExecutionContext, QueueConfig, Task, TaskBuilder, TaskId};
use crate::runtime::value::Value;

/// Context that records how deeply it is entered.
#[derive(Debug, Default)]
pub(super) struct DepthContext {
    pub depth: Cell<i32>,
    pub entries: Cell<u32>,
}

impl ExecutionContext for DepthContext {
    fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
        self.entries.set(self.entries.get() + 1);
    }

    fn exit(&self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Shared execution log.
pub(super) fn log() -> Rc<RefCell<Vec<u32>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[cfg(test)]
mod task_id_tests {
    use super::*;

    #[test]
    fn test_task_id_inner() {
        let id = TaskId(5);
        assert_eq!(id.inner(), 5);
        assert_eq!(usize::from(id), 5);
        assert_eq!(TaskId::from(5), id);
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(42).to_string(), "Task(42)");
    }

    #[test]
    fn test_task_id_ord() {
        assert!(TaskId(1) < TaskId(2));
    }
}

#[cfg(test)]
mod task_tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new(TaskId(1), || Ok(()));
        assert_eq!(task.id(), TaskId(1));
        assert!(task.name().is_none());
        assert!(task.context().is_none());
    }

    #[test]
    fn test_task_builder_name() {
        let task = TaskBuilder::new().name("flush").build(TaskId(2), || Ok(()));
        assert_eq!(task.name(), Some("flush"));
        let debug = format!("{:?}", task);
        assert!(debug.contains("flush"));
    }

    #[test]
    fn test_task_run_ok() {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let task = Task::new(TaskId(1), move || {
            flag.set(true);
            Ok(())
        });
        assert!(task.run().is_ok());
        assert!(ran.get());
    }

    #[test]
    fn test_task_run_err() {
        let task = Task::new(TaskId(9), || Err(Value::from("boom")));
        let err = task.run().unwrap_err();
        assert_eq!(err.task, TaskId(9));
        assert_eq!(err.thrown, Value::from("boom"));
        assert_eq!(err.to_string(), "uncaught exception in Task(9): boom");
    }

    #[test]
    fn test_context_entered_and_exited() {
        let context = Rc::new(DepthContext::default());
        let observed = Rc::new(Cell::new(0));

        let inside = context.clone();
        let seen = observed.clone();
        let task = TaskBuilder::new()
            .context(context.clone())
            .build(TaskId(1), move || {
                seen.set(inside.depth.get());
                Ok(())
            });

        task.run().unwrap();
        assert_eq!(observed.get(), 1);
        assert_eq!(context.depth.get(), 0);
    }

    #[test]
    fn test_context_left_entered_on_failure() {
        let context = Rc::new(DepthContext::default());
        let task = TaskBuilder::new()
            .context(context.clone())
            .build(TaskId(1), || Err(Value::error("fail")));

        assert!(task.run().is_err());
        assert_eq!(context.depth.get(), 1);
    }
}

#[cfg(test)]
mod queue_config_tests {
    use super::*;

    #[test]
    fn test_queue_config_default() {
        assert_eq!(QueueConfig::default().capacity, 1024);
    }

    #[test]
    fn test_queue_config_missing_capacity() {
        let config: QueueConfig = toml::from_str("").unwrap();
        assert_eq!(config, QueueConfig::default());
    }
}
