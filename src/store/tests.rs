use std::{
    cell::Cell,
    panic::{catch_unwind, AssertUnwindSafe},
};

use assert_call::{call, CallRecorder};
use rstest::rstest;
use serde_json::{json, Value};

use super::*;
use crate::{
    test_helpers::{add, counter, Late},
    ActionType,
};

fn tick() {
    call!("tick");
}

#[test]
fn new_initializes_from_reducer() {
    let store = Store::new(counter()).unwrap();
    assert_eq!(*store.get_state().unwrap(), 0);
}

#[test]
fn preloaded_state_is_passed_to_init() {
    let store = create_store(counter(), Some(5), None).unwrap();
    assert_eq!(*store.get_state().unwrap(), 5);
}

#[test]
fn init_sees_lifecycle_action() {
    let mut cr = CallRecorder::new();
    let _store = Store::new(Reducer::<i32>::new(|state, action| {
        call!("{}", action.kind());
        Some(state.unwrap_or_default())
    }))
    .unwrap();
    cr.verify("@@oneway/INIT");
}

#[test]
fn dispatch_returns_action_and_updates_state() {
    let store = Store::new(counter()).unwrap();
    let action = store.dispatch(add(3)).unwrap();
    assert_eq!(action, add(3));
    store.dispatch("increment").unwrap();
    assert_eq!(*store.get_state().unwrap(), 4);
}

#[test]
fn unknown_action_keeps_state_identity() {
    let store = Store::new(counter()).unwrap();
    let before = store.get_state().unwrap();
    store.dispatch("unknown").unwrap();
    assert!(Rc::ptr_eq(&before, &store.get_state().unwrap()));
}

#[test]
fn listeners_are_called_in_registration_order() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let _u1 = store.subscribe(|| call!("l1")).unwrap();
    let _u2 = store.subscribe(|| call!("l2")).unwrap();
    cr.verify(());
    store.dispatch("increment").unwrap();
    cr.verify(["l1", "l2"]);
}

#[test]
fn listeners_are_called_even_if_state_is_unchanged() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let _u = store.subscribe(tick).unwrap();
    store.dispatch("unknown").unwrap();
    cr.verify("tick");
}

#[test]
fn listener_subscribed_during_dispatch_runs_from_next_dispatch() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let added = Rc::new(Cell::new(false));
    let s = store.clone();
    let _u1 = store
        .subscribe(move || {
            call!("l1");
            if !added.replace(true) {
                s.subscribe(|| call!("l3")).unwrap();
            }
        })
        .unwrap();
    let _u2 = store.subscribe(|| call!("l2")).unwrap();

    store.dispatch("increment").unwrap();
    cr.verify(["l1", "l2"]);
    store.dispatch("increment").unwrap();
    cr.verify(["l1", "l2", "l3"]);
}

#[test]
fn listener_unsubscribed_during_dispatch_runs_until_dispatch_ends() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let late = Late::<Unsubscribe>::new();
    let l = late.clone();
    let _u1 = store
        .subscribe(move || {
            call!("l1");
            if let Some(u) = l.get() {
                u.unsubscribe().unwrap();
            }
        })
        .unwrap();
    late.set(store.subscribe(|| call!("l2")).unwrap());

    store.dispatch("increment").unwrap();
    cr.verify(["l1", "l2"]);
    store.dispatch("increment").unwrap();
    cr.verify("l1");
}

#[test]
fn listener_reads_new_state() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let s = store.clone();
    let _u = store
        .subscribe(move || call!("{}", s.get_state().unwrap()))
        .unwrap();
    store.dispatch(add(10)).unwrap();
    cr.verify("10");
}

#[test]
fn listener_may_dispatch() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let s = store.clone();
    let _u = store
        .subscribe(move || {
            let state = *s.get_state().unwrap();
            call!("{state}");
            if state == 1 {
                s.dispatch("increment").unwrap();
            }
        })
        .unwrap();
    store.dispatch("increment").unwrap();
    cr.verify(["1", "2"]);
    assert_eq!(*store.get_state().unwrap(), 2);
}

#[test]
fn unsubscribe_is_idempotent() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let u = store.subscribe(tick).unwrap();
    assert_eq!(u.unsubscribe(), Ok(()));
    assert_eq!(u.unsubscribe(), Ok(()));
    store.dispatch("increment").unwrap();
    cr.verify(());
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn same_listener_can_be_registered_twice() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let first = store.subscribe(tick).unwrap();
    let _second = store.subscribe(tick).unwrap();
    store.dispatch("increment").unwrap();
    cr.verify(["tick", "tick"]);

    first.unsubscribe().unwrap();
    first.unsubscribe().unwrap();
    store.dispatch("increment").unwrap();
    cr.verify("tick");
}

#[test]
fn unsubscribe_after_store_dropped_is_noop() {
    let store = Store::new(counter()).unwrap();
    let u = store.subscribe(tick).unwrap();
    drop(store);
    assert_eq!(u.unsubscribe(), Ok(()));
}

#[test]
fn dispatch_from_reducer_is_rejected() {
    let late = Late::<Store<i32>>::new();
    let l = late.clone();
    let inner = Rc::new(RefCell::new(None));
    let inner0 = inner.clone();
    let reducer = Reducer::new(move |state: Option<Rc<i32>>, action| {
        let state = state.unwrap_or_default();
        if action.kind() == "reenter" {
            if let Some(store) = l.get() {
                *inner0.borrow_mut() = Some(store.dispatch("increment"));
            }
            return Some(Rc::new(*state + 100));
        }
        Some(state)
    });
    let store = Store::new(reducer).unwrap();
    late.set(store.clone());

    assert_eq!(store.dispatch("reenter"), Err(StoreError::ReentrantDispatch));
    assert_eq!(
        inner.borrow_mut().take(),
        Some(Err(StoreError::ReentrantDispatch))
    );
    assert_eq!(*store.get_state().unwrap(), 0);
}

#[test]
fn store_is_usable_after_rejected_dispatch() {
    let late = Late::<Store<i32>>::new();
    let l = late.clone();
    let reducer = Reducer::new(move |state: Option<Rc<i32>>, action| {
        let state = state.unwrap_or_default();
        match action.kind().as_str() {
            "reenter" => {
                let _ = l.get().map(|s| s.dispatch("reenter"));
                Some(state)
            }
            "increment" => Some(Rc::new(*state + 1)),
            _ => Some(state),
        }
    });
    let store = Store::new(reducer).unwrap();
    late.set(store.clone());
    assert!(store.dispatch("reenter").is_err());
    store.dispatch("increment").unwrap();
    assert_eq!(*store.get_state().unwrap(), 1);
}

#[rstest]
#[case("get_state", StoreError::GetStateWhileDispatching)]
#[case("subscribe", StoreError::SubscribeWhileDispatching)]
#[case("replace_reducer", StoreError::ReplaceWhileDispatching)]
fn store_calls_from_reducer_are_rejected(#[case] call: &'static str, #[case] expected: StoreError) {
    let late = Late::<Store<i32>>::new();
    let l = late.clone();
    let seen = Rc::new(RefCell::new(None));
    let seen0 = seen.clone();
    let reducer = Reducer::new(move |state: Option<Rc<i32>>, action| {
        if action.kind() == "probe" {
            if let Some(store) = l.get() {
                let e = match call {
                    "get_state" => store.get_state().err(),
                    "subscribe" => store.subscribe(|| {}).err(),
                    _ => store.replace_reducer(counter()).err(),
                };
                *seen0.borrow_mut() = e;
            }
        }
        Some(state.unwrap_or_default())
    });
    let store = Store::new(reducer).unwrap();
    late.set(store.clone());

    assert_eq!(store.dispatch("probe"), Err(expected.clone()));
    assert_eq!(seen.borrow_mut().take(), Some(expected));
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn unsubscribe_from_reducer_is_rejected() {
    let mut cr = CallRecorder::new();
    let late = Late::<Unsubscribe>::new();
    let l = late.clone();
    let reducer = Reducer::new(move |state: Option<Rc<i32>>, action| {
        if action.kind() == "probe" {
            if let Some(u) = l.get() {
                assert_eq!(u.unsubscribe(), Err(StoreError::UnsubscribeWhileDispatching));
            }
        }
        Some(state.unwrap_or_default())
    });
    let store = Store::new(reducer).unwrap();
    let u = store.subscribe(tick).unwrap();
    late.set(u.clone());

    assert_eq!(
        store.dispatch("probe"),
        Err(StoreError::UnsubscribeWhileDispatching)
    );
    assert!(u.is_subscribed());
    store.dispatch("other").unwrap();
    cr.verify("tick");
}

#[test]
fn reducer_returning_none_fails_dispatch() {
    let mut cr = CallRecorder::new();
    let reducer = Reducer::new(|state: Option<Rc<i32>>, action| {
        if action.kind() == "broken" {
            None
        } else {
            Some(state.unwrap_or_default())
        }
    });
    let store = Store::new(reducer).unwrap();
    let before = store.get_state().unwrap();
    let _u = store.subscribe(tick).unwrap();
    assert_eq!(
        store.dispatch("broken"),
        Err(StoreError::ReducerReturnedNone {
            action_type: ActionType::from("broken")
        })
    );
    cr.verify(());
    assert!(Rc::ptr_eq(&before, &store.get_state().unwrap()));
}

#[test]
fn reducer_returning_none_on_init_fails_construction() {
    let reducer = Reducer::<i32>::new(|_, _| None);
    let e = Store::new(reducer).err();
    assert_eq!(
        e,
        Some(StoreError::ReducerReturnedNone {
            action_type: Lifecycle::Init.into()
        })
    );
}

#[test]
fn panicking_reducer_leaves_store_idle() {
    let reducer = Reducer::new(|state: Option<Rc<i32>>, action| {
        if action.kind() == "panic" {
            panic!("reducer failed");
        }
        Some(state.unwrap_or_default())
    });
    let store = Store::new(reducer).unwrap();
    let s = store.clone();
    let r = catch_unwind(AssertUnwindSafe(move || s.dispatch("panic")));
    assert!(r.is_err());
    assert_eq!(*store.get_state().unwrap(), 0);
    assert!(store.dispatch("other").is_ok());
}

#[test]
fn reducer_panicking_after_rejected_call_leaves_store_usable() {
    let late = Late::<Store<i32>>::new();
    let l = late.clone();
    let reducer = Reducer::new(move |state: Option<Rc<i32>>, action| {
        if action.kind() == "panic" {
            if let Some(store) = l.get() {
                let _ = store.get_state();
            }
            panic!("reducer failed");
        }
        Some(Rc::new(state.map_or(0, |s| *s) + 1))
    });
    let store = Store::new(reducer).unwrap();
    late.set(store.clone());
    let s = store.clone();
    assert!(catch_unwind(AssertUnwindSafe(move || s.dispatch("panic"))).is_err());
    assert_eq!(store.dispatch("harmless"), Ok(Action::new("harmless")));
    assert_eq!(*store.get_state().unwrap(), 2);
}

#[test]
fn replace_reducer_dispatches_replace() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    store.dispatch(add(4)).unwrap();
    let _u = store.subscribe(tick).unwrap();

    store
        .replace_reducer(Reducer::new(|state: Option<Rc<i32>>, action| {
            call!("{}", action.kind());
            Some(Rc::new(state.map_or(0, |s| *s) * 10))
        }))
        .unwrap();
    cr.verify(["@@oneway/REPLACE", "tick"]);
    assert_eq!(*store.get_state().unwrap(), 40);
}

#[rstest]
#[case(json!([1, 2]), StoreError::NonRecordAction { kind: "array" })]
#[case(json!("increment"), StoreError::NonRecordAction { kind: "string" })]
#[case(Value::Null, StoreError::NonRecordAction { kind: "null" })]
#[case(json!({ "amount": 1 }), StoreError::MissingActionType)]
#[case(json!({ "type": null }), StoreError::MissingActionType)]
fn dispatch_value_rejects_invalid_actions(#[case] value: Value, #[case] expected: StoreError) {
    let store = Store::new(counter()).unwrap();
    assert_eq!(store.dispatch_value(value), Err(expected));
    assert_eq!(*store.get_state().unwrap(), 0);
}

#[test]
fn dispatch_value_accepts_records() {
    let store = Store::new(counter()).unwrap();
    store
        .dispatch_value(json!({ "type": "add", "amount": 7 }))
        .unwrap();
    assert_eq!(*store.get_state().unwrap(), 7);
}

#[test]
fn dispatcher_fails_after_store_dropped() {
    let store = Store::new(counter()).unwrap();
    let dispatch = store.dispatcher();
    drop(store);
    assert_eq!(dispatch.call("increment"), Err(StoreError::StoreDropped));
}

fn logging_enhancer(name: &'static str) -> Enhancer<i32> {
    Enhancer::new(move |create| {
        call!("wrap {name}");
        StoreConstructor::new(move |reducer, preloaded_state| {
            call!("construct {name}");
            create.construct(reducer, preloaded_state)
        })
    })
}

#[test]
fn enhancer_receives_reducer_and_preloaded_state() {
    let mut cr = CallRecorder::new();
    let store = create_store(counter(), Some(2), Some(logging_enhancer("a"))).unwrap();
    cr.verify(["wrap a", "construct a"]);
    assert_eq!(*store.get_state().unwrap(), 2);
}

#[test]
fn compose_enhancers_first_is_outermost() {
    let mut cr = CallRecorder::new();
    let enhancer = compose_enhancers(vec![logging_enhancer("a"), logging_enhancer("b")]);
    let _store = create_store(counter(), None, Some(enhancer)).unwrap();
    cr.verify(["wrap b", "wrap a", "construct a", "construct b"]);
}

#[test]
fn with_dispatch_shares_state() {
    let mut cr = CallRecorder::new();
    let store = Store::new(counter()).unwrap();
    let base = store.dispatcher();
    let wrapped = store.with_dispatch(Dispatch::new(move |action| {
        call!("wrapped {}", action.kind());
        base.call(action)
    }));
    wrapped.dispatch("increment").unwrap();
    cr.verify("wrapped increment");
    assert_eq!(*store.get_state().unwrap(), 1);
}
