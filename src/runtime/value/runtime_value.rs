//! Dynamic value type flowing through promises
//!
//! `Value` is the unified representation of everything a promise can be
//! fulfilled with, rejected with, or handed to a callback:
//! - primitives are stored directly and compare structurally
//! - reference variants (`List`, `Error`, `Function`, `Promise`, `Object`)
//!   are shared through `Rc` and compare by identity (except `List`, which
//!   compares element-wise)
//!
//! Everything here is single-threaded by construction (`Rc`, not `Arc`).

use std::fmt;
use std::rc::Rc;

use super::function::Function;
use crate::runtime::promise::Promise;

/// Category of an error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain error raised by user code.
    Error,
    /// Misuse of an API (wrong argument kind, self-resolution, ...).
    TypeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "Error"),
            ErrorKind::TypeError => write!(f, "TypeError"),
        }
    }
}

/// An error object carried as a rejection reason or thrown value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorObject {
    kind: ErrorKind,
    message: String,
}

impl ErrorObject {
    /// Create an error object of the given kind.
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error category.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A foreign object that may expose a `then` capability.
///
/// Objects that are not promises of this engine participate in the
/// resolution procedure through this trait. Looking up `then` is fallible
/// because the lookup itself may throw.
pub trait Thenable: fmt::Debug {
    /// Look up the `then` member.
    ///
    /// `Ok(false)` means the object is a plain value; `Err` carries the value
    /// thrown by the lookup.
    fn has_then(&self) -> Result<bool, Value>;

    /// Invoke `then` with the given continuation callbacks.
    fn call_then(
        &self,
        on_fulfilled: Function,
        on_rejected: Function,
    ) -> Result<(), Value>;
}

/// Runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,

    /// Explicit null
    Null,

    /// Boolean
    Bool(bool),

    /// IEEE-754 number
    Number(f64),

    /// Shared string
    String(Rc<str>),

    /// Ordered sequence (results of `all`, argument packs)
    List(Rc<[Value]>),

    /// Error object
    Error(Rc<ErrorObject>),

    /// Callable
    Function(Function),

    /// Promise of this engine
    Promise(Promise),

    /// Foreign object, possibly thenable
    Object(Rc<dyn Thenable>),
}

impl Value {
    /// Build a plain error value.
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(Rc::new(ErrorObject::new(ErrorKind::Error, message)))
    }

    /// Build a type error value.
    pub fn type_error(message: impl Into<String>) -> Self {
        Value::Error(Rc::new(ErrorObject::new(ErrorKind::TypeError, message)))
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Wrap a foreign object.
    pub fn object<T: Thenable + 'static>(object: T) -> Self {
        Value::Object(Rc::new(object))
    }

    /// Name of the value's type, as reported in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
            Value::Object(_) => "object",
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are
    /// falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_)
            | Value::Error(_)
            | Value::Function(_)
            | Value::Promise(_)
            | Value::Object(_) => true,
        }
    }

    /// Whether this value takes part in the resolution procedure as a
    /// deferred value. `Err` is the value thrown while probing `then`.
    pub fn is_thenable(&self) -> Result<bool, Value> {
        match self {
            Value::Promise(_) => Ok(true),
            Value::Object(object) => object.has_then(),
            _ => Ok(false),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorObject> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(promise) => Some(promise),
            _ => None,
        }
    }

    /// Message of an error value.
    pub fn message(&self) -> Option<&str> {
        self.as_error().map(ErrorObject::message)
    }

    /// Callable view of this value; anything else counts as an absent
    /// callback.
    pub fn into_callable(self) -> Option<Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(
                    f,
                    "[{}]",
                    items
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Value::Error(error) => write!(f, "{}", error),
            Value::Function(_) => write!(f, "[function]"),
            Value::Promise(promise) => write!(f, "[promise {}]", promise.id()),
            Value::Object(_) => write!(f, "[object]"),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::from(items))
    }
}

impl From<ErrorObject> for Value {
    fn from(error: ErrorObject) -> Self {
        Value::Error(Rc::new(error))
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::Promise(promise)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}
