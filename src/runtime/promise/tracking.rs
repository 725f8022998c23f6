//! Promise lifecycle hooks and unhandled rejection tracking.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::core::Promise;
use super::PromiseId;
use crate::runtime::scheduler::MicrotaskQueue;
use crate::runtime::value::Value;

/// Observer of promise lifecycle events.
///
/// `on_handle` fires whenever a continuation is attached to a promise (after
/// adoption is chased). `on_reject` fires when a promise becomes rejected.
pub trait PromiseHooks {
    fn on_handle(
        &self,
        _promise: &Promise,
    ) {
    }

    fn on_reject(
        &self,
        _promise: &Promise,
        _reason: &Value,
    ) {
    }
}

/// A rejection nobody handled before the host's next macrotask.
#[derive(Debug, Clone, PartialEq)]
pub struct UnhandledRejection {
    pub promise: PromiseId,
    pub reason: Value,
}

/// Detects rejected promises that have no handler attached.
///
/// Each rejection schedules a check on the host's macrotask lane, so a
/// handler attached anywhere in the current microtask drain still counts.
#[derive(Debug)]
pub struct RejectionTracker {
    queue: MicrotaskQueue,
    this: Weak<RejectionTracker>,
    pending: RefCell<BTreeMap<PromiseId, Value>>,
    reported: RefCell<Vec<UnhandledRejection>>,
    /// Reported promises that have not been handled since.
    unhandled: RefCell<BTreeSet<PromiseId>>,
    handled_late: Cell<usize>,
}

impl RejectionTracker {
    pub fn new(queue: MicrotaskQueue) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            queue,
            this: this.clone(),
            pending: RefCell::new(BTreeMap::new()),
            reported: RefCell::new(Vec::new()),
            unhandled: RefCell::new(BTreeSet::new()),
            handled_late: Cell::new(0),
        })
    }

    /// Rejections reported so far.
    pub fn reports(&self) -> Vec<UnhandledRejection> {
        self.reported.borrow().clone()
    }

    /// Reported rejections that got a handler afterwards.
    pub fn handled_late(&self) -> usize {
        self.handled_late.get()
    }

    /// Rejections awaiting their check.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    fn check(
        &self,
        id: PromiseId,
    ) {
        let Some(reason) = self.pending.borrow_mut().remove(&id) else {
            return;
        };
        warn!(promise = %id, reason = %reason, "possible unhandled promise rejection");
        self.unhandled.borrow_mut().insert(id);
        self.reported.borrow_mut().push(UnhandledRejection { promise: id, reason });
    }
}

impl PromiseHooks for RejectionTracker {
    fn on_handle(
        &self,
        promise: &Promise,
    ) {
        let id = promise.id();
        if self.pending.borrow_mut().remove(&id).is_some() {
            return;
        }
        if self.unhandled.borrow_mut().remove(&id) {
            self.handled_late.set(self.handled_late.get() + 1);
            warn!(promise = %id, "promise rejection was handled asynchronously");
        }
    }

    fn on_reject(
        &self,
        promise: &Promise,
        reason: &Value,
    ) {
        let id = promise.id();
        debug!(promise = %id, "tracking rejection");
        self.pending.borrow_mut().insert(id, reason.clone());

        let this = self.this.clone();
        self.queue.set_timeout(move || {
            if let Some(tracker) = this.upgrade() {
                tracker.check(id);
            }
            Ok(())
        });
    }
}
