use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use serde_json::Value;

use crate::{compose, Action, Dispatch, Lifecycle, Reducer, Result, StoreError, Unsubscribe};

mod listeners;

pub use listeners::ListenerId;
use listeners::ListenerTable;

#[cfg(test)]
mod tests;

/// Creates a store.
///
/// The reducer is immediately called with the preloaded state (or no state) and
/// [`Lifecycle::Init`] to produce the initial state.
///
/// If `enhancer` is given, construction is delegated to the constructor it returns.
pub fn create_store<S: 'static>(
    reducer: Reducer<S>,
    preloaded_state: Option<S>,
    enhancer: Option<Enhancer<S>>,
) -> Result<Store<S>> {
    let preloaded_state = preloaded_state.map(Rc::new);
    match enhancer {
        Some(enhancer) => enhancer
            .apply(StoreConstructor::base())
            .construct(reducer, preloaded_state),
        None => build_store(reducer, preloaded_state),
    }
}

fn build_store<S: 'static>(reducer: Reducer<S>, preloaded_state: Option<Rc<S>>) -> Result<Store<S>> {
    let state = reducer.reduce(preloaded_state, &Action::lifecycle(Lifecycle::Init))?;
    tracing::debug!(target: "oneway", "store created");
    let engine = Rc::new(Engine {
        reducer: RefCell::new(reducer),
        state: RefCell::new(state),
        listeners: RefCell::new(ListenerTable::new()),
        is_dispatching: Cell::new(false),
        violation: Cell::new(None),
        released: RefCell::new(Vec::new()),
    });
    let dispatch = {
        let engine = Rc::downgrade(&engine);
        Dispatch::new(move |action| Engine::upgrade(&engine)?.dispatch(action))
    };
    Ok(Store { engine, dispatch })
}

/// The state container.
///
/// Cloning a store yields another handle to the same state.
#[derive_ex(Clone, bound())]
pub struct Store<S: 'static> {
    engine: Rc<Engine<S>>,
    dispatch: Dispatch,
}

impl<S: 'static> Store<S> {
    /// Creates a store without preloaded state or enhancer.
    pub fn new(reducer: Reducer<S>) -> Result<Self> {
        create_store(reducer, None, None)
    }

    /// Returns the current state.
    ///
    /// Fails while the reducer is running.
    pub fn get_state(&self) -> Result<Rc<S>> {
        self.engine.get_state()
    }

    /// Dispatches an action through this store's dispatch (including any middleware).
    ///
    /// Returns the dispatched action. Listeners are notified synchronously before this returns.
    pub fn dispatch(&self, action: impl Into<Action>) -> Result<Action> {
        self.dispatch.call(action)
    }

    /// Validates a JSON value as an action and dispatches it.
    pub fn dispatch_value(&self, value: Value) -> Result<Action> {
        self.dispatch(Action::from_value(value)?)
    }

    /// Registers a listener called after every successful dispatch.
    ///
    /// Changes made to the registrations during a dispatch take effect from the next dispatch.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Result<Unsubscribe> {
        self.engine.subscribe(Rc::new(listener))
    }

    /// Replaces the reducer and dispatches [`Lifecycle::Replace`].
    pub fn replace_reducer(&self, next_reducer: Reducer<S>) -> Result<()> {
        self.engine.replace_reducer(next_reducer)
    }

    /// Returns the dispatch function used by [`dispatch`](Self::dispatch).
    pub fn dispatcher(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Returns a handle to the same store whose dispatch is replaced by `dispatch`.
    ///
    /// Used by enhancers. Other operations are unaffected.
    pub fn with_dispatch(&self, dispatch: Dispatch) -> Self {
        Self {
            engine: self.engine.clone(),
            dispatch,
        }
    }

    /// Returns the number of registrations that will be notified by the next dispatch.
    pub fn listener_count(&self) -> usize {
        self.engine.flush_released();
        self.engine.listeners.borrow().len()
    }

    pub(crate) fn engine(&self) -> &Rc<Engine<S>> {
        &self.engine
    }
}

pub(crate) struct Engine<S: 'static> {
    reducer: RefCell<Reducer<S>>,
    state: RefCell<Rc<S>>,
    listeners: RefCell<ListenerTable>,
    is_dispatching: Cell<bool>,
    violation: Cell<Option<StoreError>>,
    released: RefCell<Vec<ListenerId>>,
}

impl<S: 'static> Engine<S> {
    fn upgrade(this: &Weak<Self>) -> Result<Rc<Self>> {
        this.upgrade().ok_or(StoreError::StoreDropped)
    }

    /// Rejects a call made while the reducer is running.
    ///
    /// The error is also recorded so the dispatch in progress fails even if the reducer ignores it.
    fn reject(&self, e: StoreError) -> StoreError {
        let violation = self.violation.take().unwrap_or_else(|| e.clone());
        self.violation.set(Some(violation));
        e
    }

    pub fn get_state(&self) -> Result<Rc<S>> {
        if self.is_dispatching.get() {
            return Err(self.reject(StoreError::GetStateWhileDispatching));
        }
        Ok(self.state.borrow().clone())
    }

    pub fn subscribe(self: &Rc<Self>, listener: Rc<dyn Fn()>) -> Result<Unsubscribe> {
        let id = self.add_listener(listener)?;
        Ok(self.unsubscribe_handle(id))
    }

    pub fn add_listener(&self, listener: Rc<dyn Fn()>) -> Result<ListenerId> {
        if self.is_dispatching.get() {
            return Err(self.reject(StoreError::SubscribeWhileDispatching));
        }
        let id = self.listeners.borrow_mut().insert(listener);
        tracing::trace!(target: "oneway", %id, "subscribe");
        Ok(id)
    }

    pub fn unsubscribe_handle(self: &Rc<Self>, id: ListenerId) -> Unsubscribe {
        let engine = Rc::downgrade(self);
        Unsubscribe::from_fn(move || match engine.upgrade() {
            Some(engine) => engine.unsubscribe(id),
            None => Ok(()),
        })
    }

    /// Removes a registration without failing.
    ///
    /// While the reducer is running the removal is queued and applied before listeners are notified.
    pub fn release(&self, id: ListenerId) {
        if self.is_dispatching.get() {
            self.released.borrow_mut().push(id);
        } else {
            self.listeners.borrow_mut().remove(id);
        }
    }

    fn flush_released(&self) {
        let released = self.released.take();
        if released.is_empty() {
            return;
        }
        let mut listeners = self.listeners.borrow_mut();
        for id in released {
            listeners.remove(id);
        }
    }

    fn unsubscribe(&self, id: ListenerId) -> Result<()> {
        if self.is_dispatching.get() {
            return Err(self.reject(StoreError::UnsubscribeWhileDispatching));
        }
        if self.listeners.borrow_mut().remove(id) {
            tracing::trace!(target: "oneway", %id, "unsubscribe");
        }
        Ok(())
    }

    pub fn dispatch(&self, action: Action) -> Result<Action> {
        if self.is_dispatching.get() {
            return Err(self.reject(StoreError::ReentrantDispatch));
        }
        tracing::trace!(target: "oneway", action_type = %action.kind(), "dispatch");
        self.violation.set(None);
        self.flush_released();
        let reducer = self.reducer.borrow().clone();
        let state = self.state.borrow().clone();
        let (result, violation) = {
            let _guard = DispatchingGuard::enter(&self.is_dispatching);
            let result = reducer.reduce(Some(state), &action);
            (result, self.violation.take())
        };
        self.flush_released();
        if let Some(e) = violation {
            return Err(e);
        }
        *self.state.borrow_mut() = result?;

        let listeners = self.listeners.borrow_mut().snapshot();
        for listener in listeners.values() {
            listener();
        }
        Ok(action)
    }

    fn replace_reducer(&self, next_reducer: Reducer<S>) -> Result<()> {
        if self.is_dispatching.get() {
            return Err(self.reject(StoreError::ReplaceWhileDispatching));
        }
        *self.reducer.borrow_mut() = next_reducer;
        tracing::debug!(target: "oneway", "reducer replaced");
        self.dispatch(Action::lifecycle(Lifecycle::Replace))?;
        Ok(())
    }
}

/// Marks the store as dispatching until dropped, including during unwinding.
struct DispatchingGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchingGuard<'a> {
    fn enter(is_dispatching: &'a Cell<bool>) -> Self {
        is_dispatching.set(true);
        Self(is_dispatching)
    }
}
impl Drop for DispatchingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

type ConstructFn<S> = dyn Fn(Reducer<S>, Option<Rc<S>>) -> Result<Store<S>>;

/// A store construction function: `(reducer, preloaded_state) -> store`.
#[derive_ex(Clone, bound())]
pub struct StoreConstructor<S: 'static>(Rc<ConstructFn<S>>);

impl<S: 'static> StoreConstructor<S> {
    pub fn new(f: impl Fn(Reducer<S>, Option<Rc<S>>) -> Result<Store<S>> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// The constructor that builds a store without any enhancer.
    pub fn base() -> Self {
        Self::new(build_store)
    }

    pub fn construct(&self, reducer: Reducer<S>, preloaded_state: Option<Rc<S>>) -> Result<Store<S>> {
        (self.0)(reducer, preloaded_state)
    }
}

/// Wraps a store constructor to alter the capabilities of the stores it builds.
#[derive_ex(Clone, bound())]
pub struct Enhancer<S: 'static>(Rc<dyn Fn(StoreConstructor<S>) -> StoreConstructor<S>>);

impl<S: 'static> Enhancer<S> {
    pub fn new(f: impl Fn(StoreConstructor<S>) -> StoreConstructor<S> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn apply(&self, create_store: StoreConstructor<S>) -> StoreConstructor<S> {
        (self.0)(create_store)
    }
}

/// Combines enhancers into one; the first enhancer is the outermost.
pub fn compose_enhancers<S: 'static>(enhancers: Vec<Enhancer<S>>) -> Enhancer<S> {
    let composed = compose(
        enhancers
            .into_iter()
            .map(|e| -> Box<dyn Fn(StoreConstructor<S>) -> StoreConstructor<S>> {
                Box::new(move |c: StoreConstructor<S>| e.apply(c))
            })
            .collect(),
    );
    Enhancer::new(move |c| composed(c))
}
