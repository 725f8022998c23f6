//! Ordering guarantees observed through the public API

use std::cell::RefCell;
use std::rc::Rc;

use microtask_promise::runtime::promise::{InspectablePromise, Promise, Realm, SynchronousInspectable};
use microtask_promise::runtime::value::{Function, Value};
use microtask_promise::util::config::RuntimeConfig;
use microtask_promise::new_runtime;

fn push(
    log: &Rc<RefCell<Vec<String>>>,
    entry: &'static str,
) -> Function {
    let log = log.clone();
    Function::new(move |value| {
        log.borrow_mut().push(entry.to_string());
        Ok(value)
    })
}

#[test]
fn test_interleaved_chains() {
    let (mut event_loop, realm) = new_runtime(&RuntimeConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));

    realm
        .resolve("a")
        .then(Some(push(&log, "a1")), None)
        .then(Some(push(&log, "a2")), None);
    realm
        .resolve("b")
        .then(Some(push(&log, "b1")), None)
        .then(Some(push(&log, "b2")), None);
    log.borrow_mut().push("sync".to_string());

    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["sync", "a1", "b1", "a2", "b2"]);
}

#[test]
fn test_separate_queues_are_isolated() {
    let (mut first_loop, first) = new_runtime(&RuntimeConfig::default());
    let (mut second_loop, second) = new_runtime(&RuntimeConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));

    first.resolve(1).then(Some(push(&log, "first")), None);
    second.resolve(2).then(Some(push(&log, "second")), None);

    second_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["second"]);
    first_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["second", "first"]);
}

#[test]
fn test_long_chain_settles() {
    let (mut event_loop, realm) = new_runtime(&RuntimeConfig::default());
    let mut promise = realm.resolve(0);
    for _ in 0..5000 {
        promise = promise.then(
            Some(Function::new(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) + 1.0)))),
            None,
        );
    }
    event_loop.run_until_idle().unwrap();
    let promise = InspectablePromise::from(promise);
    assert_eq!(promise.value(), Ok(Value::from(5000)));
}

fn countdown(
    realm: &Realm,
    remaining: u32,
) -> Promise {
    let next = realm.clone();
    realm.resolve(remaining).then(
        Some(Function::new(move |_| {
            if remaining == 0 {
                Ok(Value::from("done"))
            } else {
                Ok(Value::Promise(countdown(&next, remaining - 1)))
            }
        })),
        None,
    )
}

#[test]
fn test_recursive_adoption_chain_settles_and_drops() {
    let (mut event_loop, realm) = new_runtime(&RuntimeConfig::default());
    let head = countdown(&realm, 100_000);
    let outcome = InspectablePromise::from(head.then(None, None));

    event_loop.run_until_idle().unwrap();
    assert_eq!(outcome.value(), Ok(Value::from("done")));

    drop(outcome);
    drop(head);
}

#[test]
fn test_dropping_pending_chain() {
    let (_event_loop, realm) = new_runtime(&RuntimeConfig::default());
    let head = realm.promise(|_| Ok(()));
    let mut tail = head.clone();
    for _ in 0..100_000 {
        tail = tail.then(Some(Function::new(Ok)), None);
    }

    drop(tail);
    drop(head);
}

#[test]
fn test_inspectable_resolved_from_microtask() {
    let (mut event_loop, realm) = new_runtime(&RuntimeConfig::default());
    let source: Realm = realm.clone();
    let promise = realm.inspectable(move |functions| {
        source.resolve(10).then(Some(functions.resolve_fn()), None);
        Ok(())
    });

    assert!(promise.is_pending());
    event_loop.run_until_idle().unwrap();
    assert_eq!(promise.value(), Ok(Value::from(10)));
}
