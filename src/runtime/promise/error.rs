//! Promise error types

use std::rc::Rc;

use thiserror::Error;

use super::PromiseId;
use crate::runtime::value::{ErrorKind, ErrorObject, Value};

/// Errors raised by the promise engine itself.
///
/// They reach user code as error values (see the `From` impl below), either
/// as rejection reasons or as the `Err` arm of a dynamic entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromiseError {
    /// A promise was resolved with itself
    #[error("A promise cannot be resolved with itself.")]
    SelfResolution,

    /// Adoption would make a promise wait on itself through other promises
    #[error("Chaining cycle detected for {0}")]
    ChainingCycle(PromiseId),

    /// The resolver handed to the constructor is not callable
    #[error("not a function")]
    NotAFunction,

    /// The constructor was invoked as a plain call
    #[error("Promises must be constructed via new")]
    ConstructedWithoutNew,

    /// `value()` on a promise that is not fulfilled
    #[error("Cannot get a value of an unfulfilled promise.")]
    NotFulfilled,

    /// `reason()` on a promise that is not rejected
    #[error("Cannot get a rejection reason of a non-rejected promise.")]
    NotRejected,
}

impl PromiseError {
    /// Error category used when surfacing this error as a value.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromiseError::NotFulfilled | PromiseError::NotRejected => ErrorKind::Error,
            _ => ErrorKind::TypeError,
        }
    }
}

impl From<PromiseError> for Value {
    fn from(err: PromiseError) -> Self {
        Value::Error(Rc::new(ErrorObject::new(err.kind(), err.to_string())))
    }
}
