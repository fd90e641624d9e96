use std::{
    any::Any,
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    fmt,
    rc::Rc,
};

use parse_display::Display;

use crate::{diagnostics, Action, ActionType, Lifecycle, Reducer, Result, StoreError};


/// A type-erased piece of a [`StateRecord`].
pub type Slice = Rc<dyn Any>;

/// A reducer over one type-erased slice.
pub type SliceReducer = Reducer<dyn Any>;

/// State of a reducer built by [`combine_reducers`]: one slice per key.
#[derive(Clone, Default)]
pub struct StateRecord {
    slices: BTreeMap<String, Slice>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slice, replacing any slice stored under the same key.
    pub fn with<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, Rc::new(value));
        self
    }

    pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: Rc<T>) {
        self.slices.insert(key.into(), value);
    }

    pub fn insert_slice(&mut self, key: impl Into<String>, slice: Slice) {
        self.slices.insert(key.into(), slice);
    }

    /// Returns the slice stored under `key` if it has type `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        self.slices.get(key)?.clone().downcast().ok()
    }

    pub fn get_slice(&self, key: &str) -> Option<&Slice> {
        self.slices.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Slice> {
        self.slices.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slices.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Returns `true` if both records hold the same allocation for `key`.
    pub fn ptr_eq_slice(&self, other: &Self, key: &str) -> bool {
        match (self.slices.get(key), other.slices.get(key)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slices.keys()).finish()
    }
}

/// Erases the slice type of a reducer.
///
/// A slice of another type is passed to `reducer` as absent.
pub fn slice_reducer<T: 'static>(reducer: Reducer<T>) -> SliceReducer {
    Reducer::fallible(move |state: Option<Slice>, action: &Action| {
        let state = state.and_then(|s| s.downcast::<T>().ok());
        Ok(reducer.reduce(state, action)? as Slice)
    })
}

/// Builder for a reducer over a [`StateRecord`].
///
/// ```
/// use oneway::{CombineReducers, Reducer, Store};
///
/// let reducer = CombineReducers::new()
///     .reducer("count", Reducer::with_initial(|| 0, |n: &i32, a| (a.kind() == "inc").then(|| n + 1)))
///     .reducer("name", Reducer::with_initial(String::new, |_, _| None))
///     .build();
/// let store = Store::new(reducer).unwrap();
/// store.dispatch("inc").unwrap();
/// assert_eq!(*store.get_state().unwrap().get::<i32>("count").unwrap(), 1);
/// ```
#[derive(Default)]
pub struct CombineReducers {
    entries: Vec<(String, Option<SliceReducer>)>,
}

impl CombineReducers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slice<T: 'static>(
        self,
        key: impl Into<String>,
        f: impl Fn(Option<Rc<T>>, &Action) -> Option<Rc<T>> + 'static,
    ) -> Self {
        self.reducer(key, Reducer::new(f))
    }

    pub fn reducer<T: 'static>(self, key: impl Into<String>, reducer: Reducer<T>) -> Self {
        self.optional_slice(key, Some(reducer))
    }

    /// Adds an entry whose reducer may be missing.
    ///
    /// Missing entries are skipped with a warning.
    pub fn optional_slice<T: 'static>(
        mut self,
        key: impl Into<String>,
        reducer: Option<Reducer<T>>,
    ) -> Self {
        self.entries.push((key.into(), reducer.map(slice_reducer)));
        self
    }

    pub fn build(self) -> Reducer<StateRecord> {
        combine_reducers(self.entries)
    }
}

/// Builds one reducer from a list of keyed slice reducers.
///
/// Every slice reducer is probed once here with [`Lifecycle::Init`] and once with a random
/// action type. A probe that yields no state makes every call of the returned reducer fail,
/// but does not make this function fail.
pub fn combine_reducers(
    entries: impl IntoIterator<Item = (String, Option<SliceReducer>)>,
) -> Reducer<StateRecord> {
    let mut reducers: Vec<(String, SliceReducer)> = Vec::new();
    for (key, reducer) in entries {
        match reducer {
            Some(reducer) => {
                if let Some(entry) = reducers.iter_mut().find(|(k, _)| *k == key) {
                    entry.1 = reducer;
                } else {
                    reducers.push((key, reducer));
                }
            }
            None => diagnostics::warning(format_args!("No reducer provided for key \"{key}\"")),
        }
    }

    let shape_error = assert_reducer_shape(&reducers).err();
    let keys: Vec<String> = reducers.iter().map(|(k, _)| k.clone()).collect();
    let unexpected_key_cache = RefCell::new(HashSet::new());

    Reducer::fallible(move |state: Option<Rc<StateRecord>>, action: &Action| {
        if let Some(e) = &shape_error {
            return Err(e.clone());
        }
        if diagnostics::enabled() {
            let warning = unexpected_state_shape_warning(
                state.as_deref(),
                &keys,
                action,
                &mut unexpected_key_cache.borrow_mut(),
            );
            if let Some(warning) = warning {
                diagnostics::warning(warning);
            }
        }

        let state = state.unwrap_or_default();
        let mut has_changed = false;
        let mut next_state = StateRecord::new();
        for (key, reducer) in &reducers {
            let previous = state.get_slice(key).cloned();
            let next = reducer
                .reduce(previous.clone(), action)
                .map_err(|e| match e {
                    StoreError::ReducerReturnedNone { action_type } => {
                        StoreError::SliceReturnedNone {
                            key: key.clone(),
                            action_type,
                        }
                    }
                    e => e,
                })?;
            has_changed |= !previous.is_some_and(|p| Rc::ptr_eq(&p, &next));
            next_state.insert_slice(key.clone(), next);
        }
        has_changed |= reducers.len() != state.len();
        Ok(if has_changed {
            Rc::new(next_state)
        } else {
            state
        })
    })
}

fn assert_reducer_shape(reducers: &[(String, SliceReducer)]) -> Result<()> {
    let init = Action::lifecycle(Lifecycle::Init);
    for (key, reducer) in reducers {
        reducer.reduce(None, &init).map_err(|e| match e {
            StoreError::ReducerReturnedNone { .. } => {
                StoreError::SliceInitReturnedNone { key: key.clone() }
            }
            e => e,
        })?;
        let probe = Action::new(ActionType::probe_unknown());
        reducer.reduce(None, &probe).map_err(|e| match e {
            StoreError::ReducerReturnedNone { .. } => {
                StoreError::SliceProbeReturnedNone { key: key.clone() }
            }
            e => e,
        })?;
    }
    Ok(())
}

/// A development diagnostic about the shape of a state record.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("{0}")]
pub struct ShapeWarning(String);

impl ShapeWarning {
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Checks `state` against the keys known to a composite reducer.
///
/// Keys reported once are added to `unexpected_key_cache` and are not reported again.
/// [`Lifecycle::Replace`] is never reported, because replacing a reducer may change the shape.
pub fn unexpected_state_shape_warning(
    state: Option<&StateRecord>,
    reducer_keys: &[String],
    action: &Action,
    unexpected_key_cache: &mut HashSet<String>,
) -> Option<ShapeWarning> {
    let argument_name = if action.is(Lifecycle::Init) {
        "preloaded state passed to create_store"
    } else {
        "previous state received by the reducer"
    };
    if reducer_keys.is_empty() {
        return Some(ShapeWarning(
            "Store does not have a valid reducer. \
             Make sure the entries passed to combine_reducers have reducers."
                .into(),
        ));
    }

    let unexpected_keys: Vec<&str> = state
        .into_iter()
        .flat_map(|s| s.keys())
        .filter(|key| !reducer_keys.iter().any(|k| k.as_str() == *key))
        .filter(|key| !unexpected_key_cache.contains(*key))
        .collect();
    for key in &unexpected_keys {
        unexpected_key_cache.insert((*key).to_owned());
    }

    if action.is(Lifecycle::Replace) || unexpected_keys.is_empty() {
        return None;
    }
    Some(ShapeWarning(format!(
        "Unexpected {} \"{}\" found in {argument_name}. \
         Expected to find one of the known reducer keys instead: \"{}\". \
         Unexpected keys will be ignored.",
        if unexpected_keys.len() > 1 { "keys" } else { "key" },
        unexpected_keys.join("\", \""),
        reducer_keys.join("\", \""),
    )))
}
