use std::{
    cell::RefCell,
    collections::VecDeque,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll, Waker},
};

use derive_ex::derive_ex;
use futures::Stream;

use crate::{store::Engine, ListenerId, Result, Store, Unsubscribe};


/// Receives state snapshots from a [`SubscribableState`].
pub trait Observer<S: ?Sized> {
    fn next(&self, state: &Rc<S>) {
        let _ = state;
    }
}
impl<S: ?Sized, F: Fn(&Rc<S>)> Observer<S> for F {
    fn next(&self, state: &Rc<S>) {
        self(state)
    }
}

/// A source of state snapshots for reactive observers.
pub trait SubscribableState<S: 'static> {
    /// Delivers the current state immediately and then the state after every dispatch.
    ///
    /// The sequence never completes on its own; it ends when the returned handle is used.
    fn subscribe_state(&self, observer: impl Observer<S> + 'static) -> Result<Unsubscribe>;
}

/// The state of a store as an observable sequence.
#[derive_ex(Clone, bound())]
pub struct StateObservable<S: 'static> {
    engine: Rc<Engine<S>>,
}

impl<S: 'static> StateObservable<S> {
    pub fn subscribe(&self, observer: impl Observer<S> + 'static) -> Result<Unsubscribe> {
        let id = self.register(observer)?;
        Ok(self.engine.unsubscribe_handle(id))
    }

    fn register(&self, observer: impl Observer<S> + 'static) -> Result<ListenerId> {
        let engine = Rc::downgrade(&self.engine);
        let observe = Rc::new(move || {
            if let Some(state) = engine.upgrade().and_then(|e| e.get_state().ok()) {
                observer.next(&state);
            }
        });
        let id = self.engine.add_listener(observe.clone())?;
        observe();
        Ok(id)
    }

    /// Returns the sequence as a stream.
    ///
    /// The first item is the state at the time of this call. The subscription is removed when
    /// the stream is dropped.
    pub fn to_stream(&self) -> Result<StateStream<S>> {
        let queue = Rc::new(RefCell::new(StreamQueue {
            items: VecDeque::new(),
            waker: None,
        }));
        let q = queue.clone();
        let id = self.register(move |state: &Rc<S>| {
            let mut q = q.borrow_mut();
            q.items.push_back(state.clone());
            if let Some(waker) = q.waker.take() {
                waker.wake();
            }
        })?;
        Ok(StateStream {
            queue,
            engine: Rc::downgrade(&self.engine),
            id,
        })
    }
}
impl<S: 'static> SubscribableState<S> for StateObservable<S> {
    fn subscribe_state(&self, observer: impl Observer<S> + 'static) -> Result<Unsubscribe> {
        self.subscribe(observer)
    }
}

impl<S: 'static> Store<S> {
    pub fn observable(&self) -> StateObservable<S> {
        StateObservable {
            engine: self.engine().clone(),
        }
    }
}
impl<S: 'static> SubscribableState<S> for Store<S> {
    fn subscribe_state(&self, observer: impl Observer<S> + 'static) -> Result<Unsubscribe> {
        self.observable().subscribe(observer)
    }
}

struct StreamQueue<S> {
    items: VecDeque<Rc<S>>,
    waker: Option<Waker>,
}

/// A never-ending stream of state snapshots, created by [`StateObservable::to_stream`].
///
/// Dropping the stream removes its registration. A stream dropped while the reducer is running
/// is removed before listeners are notified, without failing the dispatch.
pub struct StateStream<S: 'static> {
    queue: Rc<RefCell<StreamQueue<S>>>,
    engine: Weak<Engine<S>>,
    id: ListenerId,
}

impl<S: 'static> Stream for StateStream<S> {
    type Item = Rc<S>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut q = self.queue.borrow_mut();
        match q.items.pop_front() {
            Some(state) => Poll::Ready(Some(state)),
            None => {
                q.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
impl<S: 'static> Drop for StateStream<S> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.release(self.id);
        }
    }
}
