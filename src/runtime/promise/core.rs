//! Promise state machine
//!
//! A promise starts `Pending` and leaves that state exactly once, either to a
//! terminal outcome or to `Adopted`, where it forwards every read and every
//! subscription to another promise. Callbacks never run synchronously: a
//! waiter subscribed to an already settled promise is enqueued on the
//! realm's microtask queue.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::error::PromiseError;
use super::realm::RealmShared;
use super::species::Species;
use super::{PromiseId, PromiseState};
use crate::runtime::value::{Function, Value};

/// Terminal outcome of a promise.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Fulfilled(Value),
    Rejected(Value),
}

impl Settlement {
    /// The fulfillment value or rejection reason.
    pub fn into_value(self) -> Value {
        match self {
            Settlement::Fulfilled(value) | Settlement::Rejected(value) => value,
        }
    }
}

enum State {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
    Adopted(Promise),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
            State::Adopted(_) => "adopted",
        }
    }

    fn settlement(&self) -> Option<Settlement> {
        match self {
            State::Fulfilled(value) => Some(Settlement::Fulfilled(value.clone())),
            State::Rejected(reason) => Some(Settlement::Rejected(reason.clone())),
            State::Pending | State::Adopted(_) => None,
        }
    }
}

/// A continuation registered by `then`.
pub(crate) struct Handler {
    on_fulfilled: Option<Function>,
    on_rejected: Option<Function>,
    promise: Promise,
}

impl Handler {
    pub(crate) fn new(
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
        promise: Promise,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            promise,
        }
    }

    fn invoke(
        self,
        settlement: Settlement,
    ) {
        let Handler {
            on_fulfilled,
            on_rejected,
            promise,
        } = self;

        let (callback, argument, fulfilled) = match settlement {
            Settlement::Fulfilled(value) => (on_fulfilled, value, true),
            Settlement::Rejected(reason) => (on_rejected, reason, false),
        };

        match callback {
            Some(callback) => match callback.call(argument) {
                Ok(returned) => promise.resolve_with(returned),
                Err(thrown) => promise.reject_with(thrown),
            },
            // Pass-through: a missing callback forwards the settlement.
            None if fulfilled => promise.resolve_with(argument),
            None => promise.reject_with(argument),
        }
    }
}

struct Slot {
    state: State,
    waiters: SmallVec<[Handler; 1]>,
}

impl Slot {
    /// Move out every promise this slot keeps alive: downstream promises of
    /// the waiters, the adoption target, and a promise rejection reason.
    fn detach_into(
        &mut self,
        out: &mut Vec<Promise>,
    ) {
        out.extend(self.waiters.drain(..).map(|handler| handler.promise));
        match std::mem::replace(&mut self.state, State::Pending) {
            State::Adopted(target) => out.push(target),
            State::Rejected(Value::Promise(reason)) => out.push(reason),
            other => self.state = other,
        }
    }
}

struct PromiseCell {
    id: PromiseId,
    realm: Rc<RealmShared>,
    slot: RefCell<Slot>,
}

// Chains of `then` and adoption links can be arbitrarily long; tear them
// down with a worklist instead of recursive drops.
impl Drop for PromiseCell {
    fn drop(&mut self) {
        let mut orphans = Vec::new();
        self.slot.get_mut().detach_into(&mut orphans);

        while let Some(promise) = orphans.pop() {
            if let Ok(mut cell) = Rc::try_unwrap(promise.0) {
                cell.slot.get_mut().detach_into(&mut orphans);
            }
        }
    }
}

/// A single-assignment future.
///
/// Cloning yields another handle to the same promise.
#[derive(Clone)]
pub struct Promise(Rc<PromiseCell>);

impl Promise {
    pub(crate) fn pending(realm: &Rc<RealmShared>) -> Self {
        Self::with_state(realm, State::Pending)
    }

    /// A promise born settled, bypassing hooks.
    pub(crate) fn settled(
        realm: &Rc<RealmShared>,
        settlement: Settlement,
    ) -> Self {
        let state = match settlement {
            Settlement::Fulfilled(value) => State::Fulfilled(value),
            Settlement::Rejected(reason) => State::Rejected(reason),
        };
        Self::with_state(realm, state)
    }

    pub(crate) fn with_resolver<R>(
        realm: &Rc<RealmShared>,
        resolver: R,
    ) -> Self
    where
        R: FnOnce(ResolvingFunctions) -> Result<(), Value>,
    {
        let promise = Self::pending(realm);
        promise.run_resolver(resolver);
        promise
    }

    fn with_state(
        realm: &Rc<RealmShared>,
        state: State,
    ) -> Self {
        Promise(Rc::new(PromiseCell {
            id: realm.next_promise_id(),
            realm: realm.clone(),
            slot: RefCell::new(Slot {
                state,
                waiters: SmallVec::new(),
            }),
        }))
    }

    /// Realm-unique identifier.
    #[inline]
    pub fn id(&self) -> PromiseId {
        self.0.id
    }

    /// Whether both handles refer to the same promise.
    #[inline]
    pub fn ptr_eq(
        &self,
        other: &Promise,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn realm(&self) -> &Rc<RealmShared> {
        &self.0.realm
    }

    /// Follow the adoption chain to the promise that owns the outcome.
    ///
    /// Every link visited is re-pointed at the end of the chain, so later
    /// lookups take a single step.
    pub(crate) fn target(&self) -> Promise {
        let mut path = Vec::new();
        let mut current = self.clone();
        loop {
            let next = match &current.0.slot.borrow().state {
                State::Adopted(next) => Some(next.clone()),
                _ => None,
            };
            match next {
                Some(next) => path.push(std::mem::replace(&mut current, next)),
                None => break,
            }
        }

        // The last link already points at `current`.
        path.pop();
        for link in path {
            let shortcut = State::Adopted(current.clone());
            let previous = std::mem::replace(&mut link.0.slot.borrow_mut().state, shortcut);
            drop(previous);
        }
        current
    }

    /// The promise this one adopted directly, without chasing further.
    #[cfg(test)]
    pub(crate) fn adoption_link(&self) -> Option<Promise> {
        match &self.0.slot.borrow().state {
            State::Adopted(next) => Some(next.clone()),
            _ => None,
        }
    }

    pub(crate) fn state(&self) -> PromiseState {
        let target = self.target();
        let slot = target.0.slot.borrow();
        match slot.state {
            State::Pending | State::Adopted(_) => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// The outcome, once settled (adoption chased).
    pub(crate) fn settlement(&self) -> Option<Settlement> {
        let target = self.target();
        let slot = target.0.slot.borrow();
        slot.state.settlement()
    }

    /// Waiters registered directly on this promise.
    pub fn waiter_count(&self) -> usize {
        self.0.slot.borrow().waiters.len()
    }

    /// Subscribe continuations; returns the downstream promise.
    pub fn then(
        &self,
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
    ) -> Promise {
        let downstream = Promise::pending(&self.0.realm);
        self.handle(Handler::new(on_fulfilled, on_rejected, downstream.clone()));
        downstream
    }

    /// `then` for dynamically typed callbacks: anything that is not a
    /// function counts as an absent callback.
    pub fn then_values(
        &self,
        on_fulfilled: Value,
        on_rejected: Value,
    ) -> Promise {
        self.then(on_fulfilled.into_callable(), on_rejected.into_callable())
    }

    /// `then` on behalf of a promise subclass.
    ///
    /// The downstream instance is created through `species`, whose resolving
    /// functions are driven by an internal plain promise.
    pub fn then_in<S: Species>(
        &self,
        species: &S,
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
    ) -> Result<S::Instance, Value> {
        let source = self.clone();
        species.instantiate(Box::new(move |functions: ResolvingFunctions| {
            let bridge = Promise::pending(&source.0.realm);
            bridge.then(Some(functions.resolve_fn()), Some(functions.reject_fn()));
            source.handle(Handler::new(on_fulfilled, on_rejected, bridge));
            Ok(())
        }))
    }

    pub(crate) fn handle(
        &self,
        handler: Handler,
    ) {
        let target = self.target();
        target.0.realm.notify_handle(&target);

        let settlement = {
            let mut slot = target.0.slot.borrow_mut();
            match slot.state.settlement() {
                Some(settlement) => settlement,
                None => {
                    slot.waiters.push(handler);
                    return;
                }
            }
        };

        trace!(promise = %target.id(), "scheduling handler on settled promise");
        target
            .0
            .realm
            .queue
            .enqueue(move || {
                handler.invoke(settlement);
                Ok(())
            });
    }

    /// Invoke `resolver` with idempotent resolving functions; a resolver
    /// failure before any settlement rejects the promise.
    pub(crate) fn run_resolver<R>(
        &self,
        resolver: R,
    ) where
        R: FnOnce(ResolvingFunctions) -> Result<(), Value>,
    {
        let functions = ResolvingFunctions::new(self.clone());
        if let Err(thrown) = resolver(functions.clone()) {
            functions.reject(thrown);
        }
    }

    /// The promise resolution procedure.
    pub(crate) fn resolve_with(
        &self,
        value: Value,
    ) {
        match &value {
            Value::Promise(other) => {
                if other.ptr_eq(self) {
                    return self.reject_with(PromiseError::SelfResolution.into());
                }
                if other.target().ptr_eq(self) {
                    return self.reject_with(PromiseError::ChainingCycle(self.id()).into());
                }
                let other = other.clone();
                return self.transition(State::Adopted(other));
            }
            Value::Object(object) => match object.has_then() {
                Err(thrown) => return self.reject_with(thrown),
                Ok(true) => {
                    let object = object.clone();
                    return self.run_resolver(move |functions| {
                        object.call_then(functions.resolve_fn(), functions.reject_fn())
                    });
                }
                Ok(false) => {}
            },
            _ => {}
        }
        self.transition(State::Fulfilled(value));
    }

    pub(crate) fn reject_with(
        &self,
        reason: Value,
    ) {
        self.transition(State::Rejected(reason));
    }

    fn transition(
        &self,
        next: State,
    ) {
        let rejection = match &next {
            State::Rejected(reason) => Some(reason.clone()),
            _ => None,
        };

        let waiters = {
            let mut slot = self.0.slot.borrow_mut();
            if !matches!(slot.state, State::Pending) {
                trace!(promise = %self.id(), "ignoring settlement of a settled promise");
                return;
            }
            debug!(promise = %self.id(), state = next.name(), "promise left pending");
            slot.state = next;
            std::mem::take(&mut slot.waiters)
        };

        if let Some(reason) = rejection {
            self.0.realm.notify_reject(self, &reason);
        }

        // Re-dispatch through `handle` so adopted promises forward their
        // waiters to the adoption target.
        for waiter in waiters {
            self.handle(waiter);
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// The `resolve`/`reject` pair handed to a resolver.
///
/// Both share one flag: whichever is called first wins and every later call
/// is a silent no-op.
#[derive(Clone)]
pub struct ResolvingFunctions {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

impl ResolvingFunctions {
    fn new(promise: Promise) -> Self {
        Self {
            promise,
            already_resolved: Rc::new(Cell::new(false)),
        }
    }

    /// Whether `resolve` or `reject` was already called.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.already_resolved.get()
    }

    pub fn resolve(
        &self,
        value: impl Into<Value>,
    ) {
        if self.already_resolved.replace(true) {
            return;
        }
        self.promise.resolve_with(value.into());
    }

    pub fn reject(
        &self,
        reason: impl Into<Value>,
    ) {
        if self.already_resolved.replace(true) {
            return;
        }
        self.promise.reject_with(reason.into());
    }

    /// `resolve` as a callable value.
    pub fn resolve_fn(&self) -> Function {
        let this = self.clone();
        Function::new(move |value| {
            this.resolve(value);
            Ok(Value::Undefined)
        })
    }

    /// `reject` as a callable value.
    pub fn reject_fn(&self) -> Function {
        let this = self.clone();
        Function::new(move |reason| {
            this.reject(reason);
            Ok(Value::Undefined)
        })
    }
}

impl fmt::Debug for ResolvingFunctions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ResolvingFunctions")
            .field("promise", &self.promise.id())
            .field("already_resolved", &self.already_resolved.get())
            .finish()
    }
}
