//! Callable values

use std::fmt;
use std::rc::Rc;

use super::Value;

type NativeFn = dyn Fn(&[Value]) -> Result<Value, Value>;

/// A shared callable.
///
/// `Err` is the value the callable threw. Cloning shares the same callable,
/// so identity survives clones.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    /// Wrap a single-argument closure; a missing argument reads as
    /// `undefined`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Value> + 'static,
    {
        Self(Rc::new(move |args: &[Value]| {
            f(args.first().cloned().unwrap_or_default())
        }))
    }

    /// Wrap a closure taking the full argument list.
    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Value> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Call with a single argument.
    #[inline]
    pub fn call(
        &self,
        arg: Value,
    ) -> Result<Value, Value> {
        (self.0)(std::slice::from_ref(&arg))
    }

    /// Call with an argument list.
    #[inline]
    pub fn call_with(
        &self,
        args: &[Value],
    ) -> Result<Value, Value> {
        (self.0)(args)
    }

    /// Whether both handles refer to the same callable.
    #[inline]
    pub fn ptr_eq(
        &self,
        other: &Function,
    ) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Function({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}
