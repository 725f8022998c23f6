//! Property tests for queue order and combinators

use std::cell::RefCell;
use std::rc::Rc;

use microtask_promise::runtime::promise::{InspectablePromise, Realm, SynchronousInspectable};
use microtask_promise::runtime::scheduler::{EventLoop, QueueConfig};
use microtask_promise::runtime::value::Value;
use proptest::prelude::*;

/// How an input to `all` becomes available.
#[derive(Debug, Clone)]
enum Input {
    Plain(i32),
    Settled(i32),
    Delayed(i32, usize),
}

fn input_strategy() -> impl Strategy<Value = Input> {
    prop_oneof![
        any::<i32>().prop_map(Input::Plain),
        any::<i32>().prop_map(Input::Settled),
        (any::<i32>(), 0usize..6).prop_map(|(n, d)| Input::Delayed(n, d)),
    ]
}

fn to_value(
    realm: &Realm,
    input: &Input,
) -> Value {
    match input {
        Input::Plain(n) => Value::from(*n),
        Input::Settled(n) => Value::Promise(realm.resolve(*n)),
        Input::Delayed(n, delay) => {
            let mut promise = realm.resolve(*n);
            for _ in 0..*delay {
                promise = promise.then(None, None);
            }
            Value::Promise(promise)
        }
    }
}

fn number(input: &Input) -> i32 {
    match input {
        Input::Plain(n) | Input::Settled(n) | Input::Delayed(n, _) => *n,
    }
}

proptest! {
    #[test]
    fn prop_queue_is_fifo(count in 0usize..3000, capacity in 1usize..64) {
        let mut event_loop = EventLoop::with_config(&QueueConfig { capacity });
        let queue = event_loop.queue().clone();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..count {
            let order = order.clone();
            queue.enqueue(move || {
                order.borrow_mut().push(i);
                Ok(())
            });
        }
        event_loop.run_until_idle().unwrap();

        prop_assert_eq!(order.borrow().clone(), (0..count).collect::<Vec<_>>());
        prop_assert_eq!(queue.slots(), 0);
    }

    #[test]
    fn prop_all_keeps_input_order(inputs in prop::collection::vec(input_strategy(), 0..12)) {
        let mut event_loop = EventLoop::new();
        let realm = Realm::new(event_loop.queue().clone());

        let values: Vec<Value> = inputs.iter().map(|input| to_value(&realm, input)).collect();
        let all = InspectablePromise::from(realm.all(values));
        event_loop.run_until_idle().unwrap();

        let expected = Value::list(inputs.iter().map(|input| Value::from(number(input))));
        prop_assert_eq!(all.value(), Ok(expected));
    }

    #[test]
    fn prop_race_settles_with_fastest(delays in prop::collection::vec(0usize..6, 1..8)) {
        let mut event_loop = EventLoop::new();
        let realm = Realm::new(event_loop.queue().clone());

        let inputs: Vec<Input> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| Input::Delayed(i as i32, *d))
            .collect();
        let values: Vec<Value> = inputs.iter().map(|input| to_value(&realm, input)).collect();
        let race = InspectablePromise::from(realm.race(values));
        event_loop.run_until_idle().unwrap();

        let fastest = delays.iter().min().copied().unwrap_or_default();
        let winner = delays.iter().position(|d| *d == fastest).unwrap_or_default();
        prop_assert_eq!(race.value(), Ok(Value::from(winner as i32)));
    }
}
