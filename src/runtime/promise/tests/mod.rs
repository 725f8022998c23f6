//! Promise engine tests


use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::promise::{PromiseConfig, Realm};
use crate::runtime::scheduler::{ManualHost, MicrotaskQueue, TaskError};
use crate::runtime::value::{Function, Thenable, Value};

/// A realm on a hand-driven queue.
pub(super) struct Harness {
    pub host: Rc<ManualHost>,
    pub queue: MicrotaskQueue,
    pub realm: Realm,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&PromiseConfig::default())
    }

    pub fn with_config(config: &PromiseConfig) -> Self {
        let host = Rc::new(ManualHost::new());
        let queue = MicrotaskQueue::new(host.clone());
        let realm = Realm::with_config(queue.clone(), config);
        Self { host, queue, realm }
    }

    /// Flush microtasks, then macrotasks, until both are empty.
    ///
    /// Returns uncaught errors from macrotasks.
    pub fn drain(&self) -> Vec<TaskError> {
        let mut uncaught = Vec::new();
        loop {
            if let Err(err) = self.queue.flush() {
                uncaught.push(err);
                continue;
            }
            if self.host.pending_timeouts() == 0 {
                return uncaught;
            }
            uncaught.extend(self.host.run_timeouts());
        }
    }
}

pub(super) type Log = Rc<RefCell<Vec<String>>>;

pub(super) fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Callback appending `label:value` to the log and passing the value on.
pub(super) fn record(
    log: &Log,
    label: &'static str,
) -> Function {
    let log = log.clone();
    Function::new(move |value| {
        log.borrow_mut().push(format!("{}:{}", label, value));
        Ok(value)
    })
}

/// Callback appending `label:value` and rethrowing the value.
pub(super) fn record_throw(
    log: &Log,
    label: &'static str,
) -> Function {
    let log = log.clone();
    Function::new(move |value| {
        log.borrow_mut().push(format!("{}:{}", label, value));
        Err(value)
    })
}

/// Foreign thenable that settles synchronously when `then` is called.
#[derive(Debug)]
pub(super) struct SyncThenable {
    pub outcome: Result<Value, Value>,
    /// Call both callbacks, then throw.
    pub misbehave: bool,
}

impl SyncThenable {
    pub fn fulfilling(value: impl Into<Value>) -> Value {
        Value::object(SyncThenable {
            outcome: Ok(value.into()),
            misbehave: false,
        })
    }

    pub fn rejecting(reason: impl Into<Value>) -> Value {
        Value::object(SyncThenable {
            outcome: Err(reason.into()),
            misbehave: false,
        })
    }
}

impl Thenable for SyncThenable {
    fn has_then(&self) -> Result<bool, Value> {
        Ok(true)
    }

    fn call_then(
        &self,
        on_fulfilled: Function,
        on_rejected: Function,
    ) -> Result<(), Value> {
        match &self.outcome {
            Ok(value) => on_fulfilled.call(value.clone())?,
            Err(reason) => on_rejected.call(reason.clone())?,
        };
        if self.misbehave {
            on_rejected.call(Value::from("second call"))?;
            on_fulfilled.call(Value::from("third call"))?;
            return Err(Value::from("thrown after settling"));
        }
        Ok(())
    }
}

/// Foreign object whose `then` lookup throws.
#[derive(Debug)]
pub(super) struct PoisonedThen;

impl Thenable for PoisonedThen {
    fn has_then(&self) -> Result<bool, Value> {
        Err(Value::error("then getter threw"))
    }

    fn call_then(
        &self,
        _on_fulfilled: Function,
        _on_rejected: Function,
    ) -> Result<(), Value> {
        Ok(())
    }
}

/// Foreign object without `then`.
#[derive(Debug)]
pub(super) struct PlainObject;

impl Thenable for PlainObject {
    fn has_then(&self) -> Result<bool, Value> {
        Ok(false)
    }

    fn call_then(
        &self,
        _on_fulfilled: Function,
        _on_rejected: Function,
    ) -> Result<(), Value> {
        Ok(())
    }
}
