//! Promises driven by the event loop

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use microtask_promise::runtime::promise::{PromiseConfig, Realm};
use microtask_promise::runtime::scheduler::{EventLoop, ExecutionContext, MicrotaskQueue, TaskId};
use microtask_promise::runtime::value::{Function, Value};

#[derive(Debug, Default)]
struct Domain {
    depth: Cell<i32>,
}

impl ExecutionContext for Domain {
    fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn exit(&self) {
        self.depth.set(self.depth.get() - 1);
    }
}

#[test]
fn test_done_reaches_uncaught_handler() {
    let mut event_loop = EventLoop::new();
    let realm = Realm::new(event_loop.queue().clone());
    let uncaught: Rc<RefCell<Vec<(TaskId, Value)>>> = Rc::new(RefCell::new(Vec::new()));

    let sink = uncaught.clone();
    event_loop.on_uncaught(move |err| sink.borrow_mut().push((err.task, err.thrown.clone())));

    let reason = Value::error("nobody caught this");
    realm.reject(reason.clone()).done(None, None);
    event_loop.run_until_idle().unwrap();

    let uncaught = uncaught.borrow();
    assert_eq!(uncaught.len(), 1);
    assert_eq!(uncaught[0].1, reason);
}

#[test]
fn test_done_without_handler_surfaces_error() {
    let mut event_loop = EventLoop::new();
    let realm = Realm::new(event_loop.queue().clone());

    realm.reject(Value::error("escaped")).done(None, None);
    let err = event_loop.run_until_idle().unwrap_err();
    assert_eq!(err.thrown.message(), Some("escaped"));
    assert!(!event_loop.has_pending_work());
}

#[test]
fn test_tracker_reports_after_microtasks() {
    let mut event_loop = EventLoop::new();
    let config = PromiseConfig {
        track_rejections: true,
        ..PromiseConfig::default()
    };
    let realm = Realm::with_config(event_loop.queue().clone(), &config);
    let tracker = realm.rejection_tracker().unwrap().clone();

    let handled = realm.reject("handled").then(None, None);
    handled.catch(Function::new(|_| Ok(Value::Undefined)));
    let unhandled = realm.reject("unhandled");

    event_loop.run_until_idle().unwrap();
    let reports = tracker.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].promise, unhandled.id());
}

#[test]
fn test_context_visible_to_uncaught_handler() {
    let mut event_loop = EventLoop::new();
    let queue: MicrotaskQueue = event_loop.queue().clone();
    let domain = Rc::new(Domain::default());
    let observed = Rc::new(Cell::new(-1));

    let seen_by_handler = observed.clone();
    let watched = domain.clone();
    event_loop.on_uncaught(move |_| seen_by_handler.set(watched.depth.get()));

    queue.set_active_context(Some(domain.clone()));
    queue.enqueue(|| Err(Value::error("in domain")));
    queue.set_active_context(None);

    event_loop.run_until_idle().unwrap();
    assert_eq!(observed.get(), 1);
}

#[test]
fn test_compaction_over_default_capacity() {
    let mut event_loop = EventLoop::new();
    let queue = event_loop.queue().clone();
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..3000u32 {
        let order = order.clone();
        let inner_queue = queue.clone();
        queue.enqueue(move || {
            order.borrow_mut().push(i);
            if i % 1000 == 0 {
                let order = order.clone();
                inner_queue.enqueue(move || {
                    order.borrow_mut().push(10_000 + i);
                    Ok(())
                });
            }
            Ok(())
        });
    }

    event_loop.run_until_idle().unwrap();
    let order = order.borrow();
    let mut expected: Vec<u32> = (0..3000).collect();
    expected.extend([10_000, 11_000, 12_000]);
    assert_eq!(*order, expected);
    assert!(queue.slots() == 0);
}
