//! Convenience methods layered on the core: `catch`, `finally`, `done`,
//! callback-style interop.

use std::fmt;
use std::rc::Rc;

use super::core::{Promise, ResolvingFunctions};
use super::realm::Realm;
use crate::runtime::value::{Function, Value};

impl Promise {
    /// Shorthand for `then(None, Some(on_rejected))`.
    pub fn catch(
        &self,
        on_rejected: Function,
    ) -> Promise {
        self.then(None, Some(on_rejected))
    }

    /// Run `f` on either outcome and then restore that outcome.
    ///
    /// If `f` returns a thenable it is awaited first. An error from `f`, or a
    /// rejection of what it returned, replaces the original outcome.
    pub fn finally<F>(
        &self,
        f: F,
    ) -> Promise
    where
        F: Fn() -> Result<Value, Value> + 'static,
    {
        let f = Rc::new(f);
        let realm = self.realm().clone();

        let on_fulfilled = {
            let f = f.clone();
            let realm = realm.clone();
            Function::new(move |value| {
                let settled = realm.resolve_value(f()?);
                let restore = Function::new(move |_| Ok(value.clone()));
                Ok(Value::Promise(settled.then(Some(restore), None)))
            })
        };
        let on_rejected = Function::new(move |reason| {
            let settled = realm.resolve_value(f()?);
            let restore = Function::new(move |_| Err(reason.clone()));
            Ok(Value::Promise(settled.then(Some(restore), None)))
        });

        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Terminal `then`: a rejection reaching the end of the chain is
    /// rethrown from a host macrotask, surfacing as an uncaught error.
    pub fn done(
        &self,
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
    ) {
        let tail = if on_fulfilled.is_some() || on_rejected.is_some() {
            self.then(on_fulfilled, on_rejected)
        } else {
            self.clone()
        };

        let queue = self.realm().queue.clone();
        tail.then(
            None,
            Some(Function::new(move |reason| {
                queue.set_timeout(move || Err(reason));
                Ok(Value::Undefined)
            })),
        );
    }

    /// Report the outcome to a callback taking `(error, value)`.
    ///
    /// The callback runs on its own microtask; an error it returns is an
    /// uncaught task error.
    pub fn nodeify<F>(
        &self,
        callback: F,
    ) where
        F: Fn(Option<Value>, Option<Value>) -> Result<(), Value> + 'static,
    {
        let callback = Rc::new(callback);
        let queue = self.realm().queue.clone();

        let on_fulfilled = {
            let callback = callback.clone();
            let queue = queue.clone();
            Function::new(move |value| {
                let callback = callback.clone();
                queue.enqueue(move || callback(None, Some(value)));
                Ok(Value::Undefined)
            })
        };
        let on_rejected = Function::new(move |reason| {
            let callback = callback.clone();
            queue.enqueue(move || callback(Some(reason), None));
            Ok(Value::Undefined)
        });

        self.then(Some(on_fulfilled), Some(on_rejected));
    }
}

/// Completion callback handed to a denodeified function.
///
/// A truthy error rejects the promise; otherwise it fulfills with the
/// value. Only the first call counts.
#[derive(Clone)]
pub struct NodeCallback {
    functions: ResolvingFunctions,
}

impl fmt::Debug for NodeCallback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NodeCallback")
            .field("resolved", &self.functions.is_resolved())
            .finish()
    }
}

impl NodeCallback {
    fn new(functions: ResolvingFunctions) -> Self {
        Self { functions }
    }

    pub fn call(
        &self,
        err: Option<Value>,
        value: Value,
    ) {
        match err {
            Some(err) if err.is_truthy() => self.functions.reject(err),
            _ => self.functions.resolve(value),
        }
    }

    /// The callback as a callable taking `(error, value)`.
    pub fn to_function(&self) -> Function {
        let this = self.clone();
        Function::variadic(move |args| {
            let err = args.first().cloned();
            let value = args.get(1).cloned().unwrap_or_default();
            this.call(err, value);
            Ok(Value::Undefined)
        })
    }
}

impl Realm {
    /// Turn a function that reports through a trailing `(error, value)`
    /// callback into one returning a promise.
    ///
    /// A thenable returned synchronously is adopted and a synchronous error
    /// rejects, unless the callback already settled the promise.
    pub fn denodeify<F>(
        &self,
        f: F,
    ) -> impl Fn(Vec<Value>) -> Promise
    where
        F: Fn(Vec<Value>, NodeCallback) -> Result<Value, Value> + 'static,
    {
        let realm = self.clone();
        move |args| {
            realm.promise(|functions| {
                let returned = f(args, NodeCallback::new(functions.clone()))?;
                if returned.is_thenable()? {
                    functions.resolve(returned);
                }
                Ok(())
            })
        }
    }
}
