//! Promises
//!
//! Single-assignment futures whose continuations always run on a
//! [`MicrotaskQueue`](crate::runtime::scheduler::MicrotaskQueue).
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use microtask_promise::runtime::promise::Realm;
//! use microtask_promise::runtime::scheduler::{Host, ManualHost, MicrotaskQueue};
//! use microtask_promise::runtime::value::{Function, Value};
//!
//! let host: Rc<dyn Host> = Rc::new(ManualHost::new());
//! let queue = MicrotaskQueue::new(host);
//! let realm = Realm::new(queue.clone());
//!
//! let doubled = realm
//!     .resolve(21)
//!     .then(Some(Function::new(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) * 2.0)))), None);
//! queue.flush().unwrap();
//! ```

pub mod core;
pub mod error;
pub mod extensions;
pub mod realm;
pub mod species;
pub mod synchronous;
pub mod tracking;

pub use self::core::{Promise, ResolvingFunctions, Settlement};
pub use error::PromiseError;
pub use extensions::NodeCallback;
pub use realm::Realm;
pub use species::{Executor, PromiseConstructor, Species};
pub use synchronous::{InspectablePromise, SynchronousInspectable};
pub use tracking::{PromiseHooks, RejectionTracker, UnhandledRejection};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Realm-unique promise identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u64);

impl fmt::Display for PromiseId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Promise({})", self.0)
    }
}

/// Observable state of a promise, with adoption chased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for PromiseState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled => "fulfilled",
            PromiseState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Per-realm promise options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseConfig {
    /// Reuse pre-settled promises for `undefined`, `null`, booleans, `0`
    /// and `""` in `Realm::resolve`.
    #[serde(default = "default_true")]
    pub cache_small_values: bool,
    /// Install the built-in unhandled rejection tracker.
    #[serde(default)]
    pub track_rejections: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PromiseConfig {
    fn default() -> Self {
        Self {
            cache_small_values: true,
            track_rejections: false,
        }
    }
}

#[cfg(test)]
mod tests;
