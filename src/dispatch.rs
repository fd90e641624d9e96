use std::{fmt, rc::Rc};

use crate::{Action, Result};

/// A dispatch entry point: either a store's own dispatch or one wrapped by middleware.
#[derive(Clone)]
pub struct Dispatch(Rc<dyn Fn(Action) -> Result<Action>>);

impl Dispatch {
    pub fn new(f: impl Fn(Action) -> Result<Action> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, action: impl Into<Action>) -> Result<Action> {
        (self.0)(action.into())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dispatch").finish_non_exhaustive()
    }
}
