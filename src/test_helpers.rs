use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::{Arc, Mutex},
};

use derive_ex::derive_ex;
use serde_json::Value;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer, Registry,
};

use crate::{Action, Reducer};

/// A counter understanding `increment`, `decrement` and `add { amount }`.
pub fn counter() -> Reducer<i32> {
    Reducer::with_initial(
        || 0,
        |state, action| match action.kind().as_str() {
            "increment" => Some(state + 1),
            "decrement" => Some(state - 1),
            "add" => action
                .get("amount")
                .and_then(Value::as_i64)
                .map(|n| state + n as i32),
            _ => None,
        },
    )
}

pub fn add(amount: i64) -> Action {
    Action::new("add").with("amount", amount)
}

/// A slot filled after construction, for closures that need the value they are part of.
#[derive_ex(Clone, bound())]
pub struct Late<T>(Rc<RefCell<Option<T>>>);

impl<T> Late<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = Some(value);
    }
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }
}

/// Runs `f` and returns the messages of the warnings it emitted under the `oneway` target.
pub fn capture_warnings(f: impl FnOnce()) -> Vec<String> {
    let warnings = Warnings::default();
    let subscriber = Registry::default().with(warnings.clone());
    tracing::subscriber::with_default(subscriber, f);
    let messages = warnings.0.lock().unwrap().clone();
    messages
}

#[derive(Clone, Default)]
struct Warnings(Arc<Mutex<Vec<String>>>);

impl<S: Subscriber> Layer<S> for Warnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::WARN && meta.target() == "oneway" {
            let mut message = Message::default();
            event.record(&mut message);
            self.0.lock().unwrap().push(message.0);
        }
    }
}

#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
