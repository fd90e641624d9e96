use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;

use crate::{
    compose, Action, Dispatch, Enhancer, Result, Store, StoreConstructor, StoreError,
};


/// Wraps the next dispatch in the chain into this middleware's dispatch.
pub type DispatchWrapper = Box<dyn Fn(Dispatch) -> Dispatch>;

/// The capabilities handed to each middleware.
///
/// `dispatch` runs the whole middleware chain from the outermost middleware, so actions
/// dispatched from a middleware pass through every middleware again.
#[derive_ex(Clone, bound())]
pub struct MiddlewareApi<S: 'static> {
    store: Store<S>,
    dispatch: Dispatch,
}

impl<S: 'static> MiddlewareApi<S> {
    pub fn get_state(&self) -> Result<Rc<S>> {
        self.store.get_state()
    }

    pub fn dispatch(&self, action: impl Into<Action>) -> Result<Action> {
        self.dispatch.call(action)
    }

    pub fn dispatcher(&self) -> Dispatch {
        self.dispatch.clone()
    }
}

/// A dispatch interceptor: `api -> next -> dispatch`.
#[derive_ex(Clone, bound())]
pub struct Middleware<S: 'static>(Rc<dyn Fn(&MiddlewareApi<S>) -> DispatchWrapper>);

impl<S: 'static> Middleware<S> {
    pub fn new(f: impl Fn(&MiddlewareApi<S>) -> DispatchWrapper + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Creates a middleware from a function called for every action with the api and the next dispatch.
    ///
    /// The function decides whether and how to call `next`.
    pub fn from_fn(
        f: impl Fn(&MiddlewareApi<S>, &Dispatch, Action) -> Result<Action> + 'static,
    ) -> Self {
        let f = Rc::new(f);
        Self::new(move |api| {
            let f = f.clone();
            let api = api.clone();
            Box::new(move |next: Dispatch| {
                let f = f.clone();
                let api = api.clone();
                Dispatch::new(move |action| f(&api, &next, action))
            })
        })
    }

    pub fn attach(&self, api: &MiddlewareApi<S>) -> DispatchWrapper {
        (self.0)(api)
    }
}

/// Creates an enhancer that routes every dispatch through `middlewares`.
///
/// The first middleware is the outermost: it sees every action first, including actions
/// dispatched by later middleware through the api. The last middleware calls the store's own dispatch.
pub fn apply_middleware<S: 'static>(middlewares: Vec<Middleware<S>>) -> Enhancer<S> {
    let middlewares = Rc::new(middlewares);
    Enhancer::new(move |create_store| {
        let middlewares = middlewares.clone();
        StoreConstructor::new(move |reducer, preloaded_state| {
            let store = create_store.construct(reducer, preloaded_state)?;
            let slot = Rc::new(RefCell::new(Dispatch::new(|_| {
                Err(StoreError::DispatchDuringMiddlewareSetup)
            })));
            let api = MiddlewareApi {
                store: store.clone(),
                dispatch: {
                    let slot = Rc::downgrade(&slot);
                    Dispatch::new(move |action| forward(&slot, action))
                },
            };
            let chain: Vec<DispatchWrapper> = middlewares.iter().map(|m| m.attach(&api)).collect();
            let dispatch = compose(chain)(store.dispatcher());
            *slot.borrow_mut() = dispatch;
            tracing::debug!(target: "oneway", count = middlewares.len(), "middleware applied");

            Ok(store.with_dispatch(Dispatch::new(move |action| {
                let dispatch = slot.borrow().clone();
                dispatch.call(action)
            })))
        })
    })
}

fn forward(slot: &Weak<RefCell<Dispatch>>, action: Action) -> Result<Action> {
    let slot = slot.upgrade().ok_or(StoreError::StoreDropped)?;
    let dispatch = slot.borrow().clone();
    dispatch.call(action)
}
