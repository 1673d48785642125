use serde_json::Value;
use std::collections::HashMap;

use crate::error::GameError;

/// Free-form key/value properties (keys are not fixed ahead of time)
pub type Properties = HashMap<String, Value>;

/// Anything exposing a property map: entities, agents, events, commands.
pub trait HasProperties {
    /// Point-in-time copy of all properties
    fn properties(&self) -> Properties;

    /// Fails with `GameError::Immutable` for read-only objects.
    fn set_property(&self, key: &str, value: Value) -> Result<(), GameError>;

    fn property(&self, key: &str) -> Option<Value> {
        self.properties().get(key).cloned()
    }

    fn has_property(&self, key: &str) -> bool {
        self.properties().contains_key(key)
    }

    /// True when the property is the boolean `true` or the string `"true"`.
    fn is_flag_set(&self, key: &str) -> bool {
        is_truthy(self.property(key).as_ref())
    }
}

pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Storage key for a record: string ids as-is, numeric ids in decimal.
pub fn record_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
