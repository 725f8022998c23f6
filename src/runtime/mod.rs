//! Runtime system
//!
//! This module contains the value model, the microtask scheduler and the
//! promise engine built on top of it.

pub mod promise;
pub mod scheduler;
pub mod value;
