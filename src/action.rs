use std::borrow::Borrow;

use parse_display::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Result, StoreError};


const RESERVED_PREFIX: &str = "@@oneway/";

/// The discriminant of an [`Action`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("{0}")]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns a fresh, unguessable action type in the reserved namespace.
    ///
    /// Used to check that a reducer handles action types it has never seen.
    pub fn probe_unknown() -> Self {
        Self(format!(
            "{RESERVED_PREFIX}PROBE_UNKNOWN_ACTION.{}",
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this type belongs to the namespace used by lifecycle actions.
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_PREFIX)
    }

    pub fn is(&self, lifecycle: Lifecycle) -> bool {
        self.0 == lifecycle.to_string()
    }
}
impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
impl From<String> for ActionType {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl From<Lifecycle> for ActionType {
    fn from(value: Lifecycle) -> Self {
        Self(value.to_string())
    }
}
impl Borrow<str> for ActionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}
impl PartialEq<str> for ActionType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
impl PartialEq<&str> for ActionType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Actions the store generates by itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum Lifecycle {
    /// Dispatched once when a store is created, and used to probe slice reducers.
    #[display("@@oneway/INIT")]
    Init,
    /// Dispatched when the store's reducer is replaced.
    #[display("@@oneway/REPLACE")]
    Replace,
}

/// A record describing an intended state change.
///
/// Serialized as a flat object whose `type` field holds the discriminant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    kind: ActionType,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Action {
    pub fn new(kind: impl Into<ActionType>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    pub fn lifecycle(lifecycle: Lifecycle) -> Self {
        Self::new(lifecycle)
    }

    /// Adds a payload field. A field named `type` is ignored.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.payload.insert(key, value.into());
        }
        self
    }

    pub fn kind(&self) -> &ActionType {
        &self.kind
    }

    pub fn is(&self, lifecycle: Lifecycle) -> bool {
        self.kind.is(lifecycle)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Validates a value received from outside the type system and converts it into an action.
    ///
    /// The value must be an object with a non-null `type` field.
    /// Scalar types other than strings are converted to their textual form, so
    /// [`to_value`](Self::to_value) returns such a type as a string.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::NonRecordAction {
                    kind: kind_of(&other),
                })
            }
        };
        let kind = match payload.remove("type") {
            None | Some(Value::Null) => return Err(StoreError::MissingActionType),
            Some(Value::String(s)) => ActionType(s),
            Some(other) => ActionType(other.to_string()),
        };
        Ok(Self { kind, payload })
    }

    /// Returns the action as a flat JSON object. The `type` field is always a string.
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert("type".into(), Value::String(self.kind.0.clone()));
        Value::Object(map)
    }
}
impl From<Lifecycle> for Action {
    fn from(value: Lifecycle) -> Self {
        Self::lifecycle(value)
    }
}
impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Returns `true` if `value` is an object carrying a string `type` field.
pub fn is_action(value: &Value) -> bool {
    matches!(value, Value::Object(map) if matches!(map.get("type"), Some(Value::String(_))))
}

/// Names the kind of a JSON value for diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
