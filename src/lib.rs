//! microtask-promise
//!
//! A single-threaded Promises/A+ engine whose continuations run on an
//! injectable microtask queue.
//!
//! # Example
//!
//! ```
//! use microtask_promise::runtime::value::{Function, Value};
//! use microtask_promise::{new_runtime, util::config::RuntimeConfig};
//!
//! let (mut event_loop, realm) = new_runtime(&RuntimeConfig::default());
//! let seen = std::rc::Rc::new(std::cell::Cell::new(0.0));
//! let sink = seen.clone();
//! realm.resolve(1).then(
//!     Some(Function::new(move |v| {
//!         sink.set(v.as_number().unwrap_or_default());
//!         Ok(Value::Undefined)
//!     })),
//!     None,
//! );
//! assert_eq!(seen.get(), 0.0);
//! event_loop.run_until_idle().unwrap();
//! assert_eq!(seen.get(), 1.0);
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use runtime::promise::{Promise, PromiseError, Realm};
pub use runtime::scheduler::{EventLoop, MicrotaskQueue, TaskError};
pub use runtime::value::{Function, Value};

use tracing::debug;

use crate::util::config::RuntimeConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "microtask-promise";

/// Build an event loop and a realm bound to its queue.
pub fn new_runtime(config: &RuntimeConfig) -> (EventLoop, Realm) {
    debug!(
        capacity = config.queue.capacity,
        cache_small_values = config.promise.cache_small_values,
        track_rejections = config.promise.track_rejections,
        "creating runtime"
    );
    let event_loop = EventLoop::with_config(&config.queue);
    let realm = Realm::with_config(event_loop.queue().clone(), &config.promise);
    (event_loop, realm)
}
