use std::{collections::BTreeMap, rc::Rc};

use parse_display::Display;

pub(crate) type Listener = Rc<dyn Fn()>;
pub(crate) type ListenerSnapshot = Rc<BTreeMap<ListenerId, Listener>>;

/// Identifies one registration of a listener.
///
/// Ids are never reused, so they also give the registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("listener#{0}")]
pub struct ListenerId(u64);

/// Double-buffered listener registrations.
///
/// `current` is the snapshot the last dispatch iterated; `next` receives changes.
/// Both start out as the same allocation, and `next` is cloned before the first
/// change after a snapshot, so a snapshot held by an in-flight dispatch never changes.
pub(crate) struct ListenerTable {
    current: ListenerSnapshot,
    next: ListenerSnapshot,
    next_id: u64,
}

impl ListenerTable {
    pub fn new() -> Self {
        let listeners = Rc::new(BTreeMap::new());
        Self {
            current: listeners.clone(),
            next: listeners,
            next_id: 0,
        }
    }

    pub fn insert(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        Rc::make_mut(&mut self.next).insert(id, listener);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        if !self.next.contains_key(&id) {
            return false;
        }
        Rc::make_mut(&mut self.next).remove(&id).is_some()
    }

    /// Publishes the pending registrations and returns them for iteration.
    pub fn snapshot(&mut self) -> ListenerSnapshot {
        self.current = self.next.clone();
        self.current.clone()
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    #[cfg(test)]
    pub fn is_buffer_shared(&self) -> bool {
        Rc::ptr_eq(&self.current, &self.next)
    }
}
