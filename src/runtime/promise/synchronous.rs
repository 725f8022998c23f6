//! Synchronous inspection
//!
//! Only [`InspectablePromise`] exposes its state synchronously. Plain
//! promises stay opaque.

use std::ops::Deref;

use super::core::{Promise, Settlement};
use super::error::PromiseError;
use super::PromiseState;
use crate::runtime::value::Value;

/// Read access to a promise's current outcome.
///
/// Every read chases adoption.
pub trait SynchronousInspectable {
    fn state(&self) -> PromiseState;

    fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    fn is_fulfilled(&self) -> bool {
        self.state() == PromiseState::Fulfilled
    }

    fn is_rejected(&self) -> bool {
        self.state() == PromiseState::Rejected
    }

    /// The fulfillment value.
    fn value(&self) -> Result<Value, PromiseError>;

    /// The rejection reason.
    fn reason(&self) -> Result<Value, PromiseError>;
}

/// A promise with synchronous inspection enabled.
#[derive(Debug, Clone)]
pub struct InspectablePromise(Promise);

impl InspectablePromise {
    #[inline]
    pub fn promise(&self) -> &Promise {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Promise {
        self.0
    }
}

impl From<Promise> for InspectablePromise {
    fn from(promise: Promise) -> Self {
        Self(promise)
    }
}

impl From<InspectablePromise> for Value {
    fn from(promise: InspectablePromise) -> Self {
        Value::Promise(promise.0)
    }
}

impl Deref for InspectablePromise {
    type Target = Promise;

    fn deref(&self) -> &Promise {
        &self.0
    }
}

impl SynchronousInspectable for InspectablePromise {
    fn state(&self) -> PromiseState {
        self.0.state()
    }

    fn value(&self) -> Result<Value, PromiseError> {
        match self.0.settlement() {
            Some(Settlement::Fulfilled(value)) => Ok(value),
            _ => Err(PromiseError::NotFulfilled),
        }
    }

    fn reason(&self) -> Result<Value, PromiseError> {
        match self.0.settlement() {
            Some(Settlement::Rejected(reason)) => Ok(reason),
            _ => Err(PromiseError::NotRejected),
        }
    }
}
