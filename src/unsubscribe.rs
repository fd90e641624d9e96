use std::{cell::Cell, fmt, rc::Rc};

use crate::Result;


/// Handle that removes one registration from a store.
///
/// Dropping the handle does nothing; registrations are only removed explicitly.
/// Clones share the same registration, so removing through any clone removes it for all.
#[derive(Clone)]
pub struct Unsubscribe(Rc<RawUnsubscribe>);

struct RawUnsubscribe {
    is_subscribed: Cell<bool>,
    remove: Box<dyn Fn() -> Result<()>>,
}

impl Unsubscribe {
    /// Returns a handle that is already unsubscribed.
    pub fn empty() -> Self {
        let this = Self::from_fn(|| Ok(()));
        this.0.is_subscribed.set(false);
        this
    }

    /// Creates a handle that calls `remove` the first time it succeeds.
    ///
    /// If `remove` fails the registration is kept and a later call will try again.
    pub fn from_fn(remove: impl Fn() -> Result<()> + 'static) -> Self {
        Self(Rc::new(RawUnsubscribe {
            is_subscribed: Cell::new(true),
            remove: Box::new(remove),
        }))
    }

    pub fn unsubscribe(&self) -> Result<()> {
        if !self.0.is_subscribed.get() {
            return Ok(());
        }
        (self.0.remove)()?;
        self.0.is_subscribed.set(false);
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.0.is_subscribed.get()
    }
}
impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("is_subscribed", &self.is_subscribed())
            .finish()
    }
}
