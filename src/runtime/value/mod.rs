//! Core value types
//!
//! This module provides the dynamic values that promises carry: settled
//! values, rejection reasons, callbacks and foreign thenables.

pub mod function;
pub mod runtime_value;

pub use function::Function;
pub use runtime_value::*;

#[cfg(test)]
mod tests;
