use thiserror::Error;

use crate::ActionType;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Usage and configuration errors raised by the store, middleware and composite reducers.
///
/// These are programmer errors. Nothing in this crate recovers from them internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Actions must be plain objects. Instead, the actual type was: '{kind}'.")]
    NonRecordAction { kind: &'static str },

    #[error(
        "Action \"type\" property must not be absent. You may have misspelled an action type string constant."
    )]
    MissingActionType,

    #[error("Reducers may not dispatch actions.")]
    ReentrantDispatch,

    #[error(
        "You may not call store.get_state() while the reducer is executing. \
         The reducer has already received the state as an argument. \
         Pass it down from the top reducer instead of reading it from the store."
    )]
    GetStateWhileDispatching,

    #[error(
        "You may not call store.subscribe() while the reducer is executing. \
         If you would like to be notified after the store has been updated, \
         subscribe from a component and invoke store.get_state() in the callback to access the latest state."
    )]
    SubscribeWhileDispatching,

    #[error("You may not unsubscribe from a store listener while the reducer is executing.")]
    UnsubscribeWhileDispatching,

    #[error("You may not replace the reducer while the reducer is executing.")]
    ReplaceWhileDispatching,

    #[error(
        "Dispatching while constructing your middleware is not allowed. \
         Other middleware would not be applied to this dispatch."
    )]
    DispatchDuringMiddlewareSetup,

    #[error("The store backing this dispatch function has been dropped.")]
    StoreDropped,

    #[error(
        "Reducer returned no state for action \"{action_type}\". \
         To ignore an action, you must explicitly return the previous state."
    )]
    ReducerReturnedNone { action_type: ActionType },

    #[error(
        "The slice reducer for key \"{key}\" returned no state during initialization. \
         If the state passed to the reducer is absent, you must explicitly return the initial state."
    )]
    SliceInitReturnedNone { key: String },

    #[error(
        "The slice reducer for key \"{key}\" returned no state when probed with a random type. \
         Don't try to handle '@@oneway/*' actions. Instead, return the current state for any unknown actions, \
         unless it is absent, in which case you must return the initial state, regardless of the action type."
    )]
    SliceProbeReturnedNone { key: String },

    #[error(
        "When called with an action of type \"{action_type}\", the slice reducer for key \"{key}\" returned no state. \
         To ignore an action, you must explicitly return the previous state."
    )]
    SliceReturnedNone { key: String, action_type: ActionType },
}
