//! Construction capabilities.
//!
//! A [`Species`] knows how to build a promise-like instance from an
//! executor. `Promise::then_in` uses it so a promise subtype gets its own
//! type back from a chain.

use super::core::{Promise, ResolvingFunctions};
use super::error::PromiseError;
use super::realm::Realm;
use crate::runtime::value::Value;

/// Executor handed to [`Species::instantiate`].
pub type Executor = Box<dyn FnOnce(ResolvingFunctions) -> Result<(), Value>>;

/// Something that can construct promise instances.
pub trait Species {
    type Instance;

    /// Build an instance, running `executor` with its resolving functions.
    fn instantiate(
        &self,
        executor: Executor,
    ) -> Result<Self::Instance, Value>;
}

impl Species for Realm {
    type Instance = Promise;

    fn instantiate(
        &self,
        executor: Executor,
    ) -> Result<Promise, Value> {
        Ok(self.promise(executor))
    }
}

/// The dynamically typed promise constructor of a realm.
#[derive(Debug, Clone)]
pub struct PromiseConstructor {
    realm: Realm,
}

impl PromiseConstructor {
    pub(crate) fn new(realm: Realm) -> Self {
        Self { realm }
    }

    #[inline]
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Instance-producing invocation with an untyped resolver.
    ///
    /// The resolver receives `resolve` and `reject` as its two arguments.
    pub fn construct(
        &self,
        resolver: &Value,
    ) -> Result<Promise, Value> {
        let Value::Function(resolver) = resolver else {
            return Err(PromiseError::NotAFunction.into());
        };
        let resolver = resolver.clone();
        Ok(self.realm.promise(move |functions| {
            let args = [
                Value::from(functions.resolve_fn()),
                Value::from(functions.reject_fn()),
            ];
            resolver.call_with(&args).map(drop)
        }))
    }

    /// Plain invocation. Always fails.
    pub fn call(
        &self,
        _args: &[Value],
    ) -> Result<Value, Value> {
        Err(PromiseError::ConstructedWithoutNew.into())
    }
}

impl Species for PromiseConstructor {
    type Instance = Promise;

    fn instantiate(
        &self,
        executor: Executor,
    ) -> Result<Promise, Value> {
        self.realm.instantiate(executor)
    }
}
