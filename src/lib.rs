//! A unidirectional state container.
//!
//! State lives in a [`Store`] and changes only when an [`Action`] is dispatched through a pure
//! [`Reducer`]. Listeners are notified synchronously after every dispatch, reducers over keyed
//! state are built with [`CombineReducers`], and dispatch can be intercepted by [`Middleware`]
//! installed with [`apply_middleware`].
//!
//! ```
//! use oneway::{Action, Reducer, Store};
//!
//! let counter = Reducer::with_initial(|| 0, |n: &i32, action: &Action| match action.kind().as_str() {
//!     "increment" => Some(n + 1),
//!     _ => None,
//! });
//! let store = Store::new(counter).unwrap();
//! let _u = store.subscribe(|| println!("changed")).unwrap();
//! store.dispatch("increment").unwrap();
//! assert_eq!(*store.get_state().unwrap(), 1);
//! ```

mod action;
mod combine_reducers;
mod compose;
pub mod diagnostics;
mod dispatch;
mod error;
mod middleware;
mod observable;
mod reducer;
mod store;
mod unsubscribe;

#[cfg(test)]
mod test_helpers;

pub use action::*;
pub use combine_reducers::*;
pub use compose::*;
pub use dispatch::*;
pub use error::*;
pub use middleware::*;
pub use observable::*;
pub use reducer::*;
pub use store::*;
pub use unsubscribe::*;
