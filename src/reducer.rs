use std::{fmt, rc::Rc};

use derive_ex::derive_ex;

use crate::{Action, Result, StoreError};


type ReduceFn<S> = dyn Fn(Option<Rc<S>>, &Action) -> Result<Rc<S>>;

/// A pure transition function from the current state and an action to the next state.
///
/// State is passed as `Rc<S>`. Returning the same `Rc` means "unchanged", and consumers detect
/// changes with [`Rc::ptr_eq`]. An absent state (`None`) asks the reducer for its initial state.
#[derive_ex(Clone, bound())]
pub struct Reducer<S: ?Sized + 'static>(Rc<ReduceFn<S>>);

impl<S: ?Sized + 'static> Reducer<S> {
    /// Creates a reducer from a function that may return no state.
    ///
    /// Returning `None` for any action is a programmer error and is reported as
    /// [`StoreError::ReducerReturnedNone`].
    pub fn new(f: impl Fn(Option<Rc<S>>, &Action) -> Option<Rc<S>> + 'static) -> Self {
        Self::fallible(move |state, action| {
            f(state, action).ok_or_else(|| StoreError::ReducerReturnedNone {
                action_type: action.kind().clone(),
            })
        })
    }

    /// Creates a reducer that reports its own errors.
    pub fn fallible(f: impl Fn(Option<Rc<S>>, &Action) -> Result<Rc<S>> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn reduce(&self, state: Option<Rc<S>>, action: &Action) -> Result<Rc<S>> {
        (self.0)(state, action)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<S: 'static> Reducer<S> {
    /// Creates a reducer from an initial value and an update function.
    ///
    /// `update` returns `Some` with the next value when the action changes the state,
    /// and `None` to keep the current state (and its identity).
    pub fn with_initial(
        initial: impl Fn() -> S + 'static,
        update: impl Fn(&S, &Action) -> Option<S> + 'static,
    ) -> Self {
        Self::new(move |state, action| {
            let state = state.unwrap_or_else(|| Rc::new(initial()));
            Some(match update(&state, action) {
                Some(next) => Rc::new(next),
                None => state,
            })
        })
    }
}
impl<S: ?Sized + 'static> fmt::Debug for Reducer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reducer").finish_non_exhaustive()
    }
}
