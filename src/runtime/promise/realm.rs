//! Realm: the context binding promises to one microtask queue.
//!
//! Static combinators (`resolve`, `reject`, `all`, `race`) live here, along
//! with the shared pre-settled promises for small values.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::trace;

use super::core::{Promise, ResolvingFunctions, Settlement};
use super::species::PromiseConstructor;
use super::synchronous::InspectablePromise;
use super::tracking::{PromiseHooks, RejectionTracker};
use super::{PromiseConfig, PromiseId};
use crate::runtime::scheduler::MicrotaskQueue;
use crate::runtime::value::{Function, Value};

/// State every promise of a realm points back to.
pub(crate) struct RealmShared {
    pub(crate) queue: MicrotaskQueue,
    next_id: Cell<u64>,
    hooks: RefCell<Vec<Rc<dyn PromiseHooks>>>,
}

impl RealmShared {
    pub(crate) fn next_promise_id(&self) -> PromiseId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        PromiseId(id)
    }

    fn hooks(&self) -> Option<Vec<Rc<dyn PromiseHooks>>> {
        let hooks = self.hooks.borrow();
        if hooks.is_empty() {
            None
        } else {
            Some(hooks.clone())
        }
    }

    pub(crate) fn notify_handle(
        &self,
        promise: &Promise,
    ) {
        for hook in self.hooks().into_iter().flatten() {
            hook.on_handle(promise);
        }
    }

    pub(crate) fn notify_reject(
        &self,
        promise: &Promise,
        reason: &Value,
    ) {
        for hook in self.hooks().into_iter().flatten() {
            hook.on_reject(promise, reason);
        }
    }

    /// Coerce a value to a promise, without the small-value cache.
    pub(crate) fn resolve_value(
        self: &Rc<Self>,
        value: Value,
    ) -> Promise {
        if let Value::Promise(promise) = value {
            return promise;
        }
        let promise = Promise::pending(self);
        promise.resolve_with(value);
        promise
    }
}

/// Pre-settled promises for the most common small values.
#[derive(Default)]
struct SmallValues {
    undefined: OnceCell<Promise>,
    null: OnceCell<Promise>,
    truthy: OnceCell<Promise>,
    falsy: OnceCell<Promise>,
    zero: OnceCell<Promise>,
    empty_string: OnceCell<Promise>,
}

impl SmallValues {
    /// Cache slot for `value` and the canonical value stored in it.
    fn slot(
        &self,
        value: &Value,
    ) -> Option<(&OnceCell<Promise>, Value)> {
        match value {
            Value::Undefined => Some((&self.undefined, Value::Undefined)),
            Value::Null => Some((&self.null, Value::Null)),
            Value::Bool(true) => Some((&self.truthy, Value::Bool(true))),
            Value::Bool(false) => Some((&self.falsy, Value::Bool(false))),
            Value::Number(n) if *n == 0.0 => Some((&self.zero, Value::Number(0.0))),
            Value::String(s) if s.is_empty() => Some((&self.empty_string, value.clone())),
            _ => None,
        }
    }
}

/// Entry point for creating promises bound to a queue.
///
/// Cloning a realm shares its queue, id space, hooks and cache.
#[derive(Clone)]
pub struct Realm {
    shared: Rc<RealmShared>,
    constants: Rc<SmallValues>,
    tracker: Option<Rc<RejectionTracker>>,
    config: PromiseConfig,
}

impl fmt::Debug for Realm {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Realm")
            .field("queue", &self.shared.queue)
            .field("promises", &self.shared.next_id.get())
            .field("config", &self.config)
            .finish()
    }
}

impl Realm {
    /// Create a realm with the default configuration.
    #[inline]
    pub fn new(queue: MicrotaskQueue) -> Self {
        Self::with_config(queue, &PromiseConfig::default())
    }

    /// Create a realm with a custom configuration.
    pub fn with_config(
        queue: MicrotaskQueue,
        config: &PromiseConfig,
    ) -> Self {
        let shared = Rc::new(RealmShared {
            queue: queue.clone(),
            next_id: Cell::new(0),
            hooks: RefCell::new(Vec::new()),
        });

        let tracker = config.track_rejections.then(|| {
            let tracker = RejectionTracker::new(queue);
            shared.hooks.borrow_mut().push(tracker.clone());
            tracker
        });

        Self {
            shared,
            constants: Rc::new(SmallValues::default()),
            tracker,
            config: config.clone(),
        }
    }

    /// The queue continuations of this realm run on.
    #[inline]
    pub fn queue(&self) -> &MicrotaskQueue {
        &self.shared.queue
    }

    #[inline]
    pub fn config(&self) -> &PromiseConfig {
        &self.config
    }

    /// Install observation hooks.
    pub fn add_hooks(
        &self,
        hooks: Rc<dyn PromiseHooks>,
    ) {
        self.shared.hooks.borrow_mut().push(hooks);
    }

    /// The built-in rejection tracker, when enabled by configuration.
    #[inline]
    pub fn rejection_tracker(&self) -> Option<&Rc<RejectionTracker>> {
        self.tracker.as_ref()
    }

    /// The dynamic constructor of this realm.
    pub fn constructor(&self) -> PromiseConstructor {
        PromiseConstructor::new(self.clone())
    }

    /// Construct a promise, invoking `resolver` synchronously.
    ///
    /// A resolver returning `Err` before settling rejects the promise with
    /// the error value.
    pub fn promise<R>(
        &self,
        resolver: R,
    ) -> Promise
    where
        R: FnOnce(ResolvingFunctions) -> Result<(), Value>,
    {
        Promise::with_resolver(&self.shared, resolver)
    }

    /// Construct a promise that supports synchronous inspection.
    pub fn inspectable<R>(
        &self,
        resolver: R,
    ) -> InspectablePromise
    where
        R: FnOnce(ResolvingFunctions) -> Result<(), Value>,
    {
        InspectablePromise::from(self.promise(resolver))
    }

    /// Coerce `value` to a promise of this realm.
    ///
    /// Promises are returned unchanged; thenables are adopted.
    pub fn resolve(
        &self,
        value: impl Into<Value>,
    ) -> Promise {
        let value = value.into();
        if let Value::Promise(promise) = value {
            return promise;
        }

        if self.config.cache_small_values {
            if let Some((cell, canonical)) = self.constants.slot(&value) {
                return cell
                    .get_or_init(|| Promise::settled(&self.shared, Settlement::Fulfilled(canonical)))
                    .clone();
            }
        }

        self.shared.resolve_value(value)
    }

    /// A new promise rejected with `reason`. Promise reasons are not
    /// unwrapped.
    pub fn reject(
        &self,
        reason: impl Into<Value>,
    ) -> Promise {
        let reason = reason.into();
        self.promise(move |functions| {
            functions.reject(reason);
            Ok(())
        })
    }

    /// Fulfill with every input's value, in input order, or reject with the
    /// first rejection observed.
    pub fn all<I>(
        &self,
        values: I,
    ) -> Promise
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let realm = self.clone();

        self.promise(move |functions| {
            if values.is_empty() {
                functions.resolve(Value::list(Vec::new()));
                return Ok(());
            }

            let state = Rc::new(AllState {
                slots: RefCell::new(values.clone()),
                remaining: Cell::new(values.len()),
                functions,
            });
            for (index, value) in values.into_iter().enumerate() {
                if !state.fill(&realm, index, value) {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Settle like whichever input settles first.
    pub fn race<I>(
        &self,
        values: I,
    ) -> Promise
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let realm = self.clone();

        self.promise(move |functions| {
            for value in values {
                realm
                    .resolve(value)
                    .then(Some(functions.resolve_fn()), Some(functions.reject_fn()));
            }
            Ok(())
        })
    }
}

struct AllState {
    slots: RefCell<Vec<Value>>,
    remaining: Cell<usize>,
    functions: ResolvingFunctions,
}

impl AllState {
    /// Record the value for `index`, unwrapping promises and thenables.
    ///
    /// Returns `false` when probing a thenable threw; the combined promise
    /// is rejected and the remaining inputs are not visited.
    fn fill(
        self: &Rc<Self>,
        realm: &Realm,
        index: usize,
        value: Value,
    ) -> bool {
        let deferred = match &value {
            Value::Promise(promise) => {
                let target = promise.target();
                match target.settlement() {
                    Some(Settlement::Fulfilled(inner)) => return self.fill(realm, index, inner),
                    Some(Settlement::Rejected(reason)) => self.functions.reject(reason),
                    None => {}
                }
                Some(target)
            }
            Value::Object(object) => match object.has_then() {
                Ok(true) => {
                    let object = object.clone();
                    Some(realm.promise(move |functions| {
                        object.call_then(functions.resolve_fn(), functions.reject_fn())
                    }))
                }
                Ok(false) => None,
                Err(thrown) => {
                    self.functions.reject(thrown);
                    return false;
                }
            },
            _ => None,
        };

        if let Some(deferred) = deferred {
            let state = self.clone();
            let realm = realm.clone();
            deferred.then(
                Some(Function::new(move |inner| {
                    state.fill(&realm, index, inner);
                    Ok(Value::Undefined)
                })),
                Some(self.functions.reject_fn()),
            );
            return true;
        }

        self.slots.borrow_mut()[index] = value;
        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);
        if remaining == 0 {
            trace!("all inputs fulfilled");
            let results = self.slots.take();
            self.functions.resolve(Value::list(results));
        }
        true
    }
}
