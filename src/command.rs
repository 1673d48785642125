use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{CommandError, GameError};
use crate::game::Game;
use crate::properties::{HasProperties, Properties};

/// A request from an agent to affect game state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    game_id: String,
    properties: Properties,
}

impl Command {
    pub fn new(game_id: impl Into<String>, properties: Properties) -> Self {
        Self {
            game_id: game_id.into(),
            properties,
        }
    }

    /// Parse a client message. The payload must be a JSON object.
    pub fn from_json(game_id: impl Into<String>, json: &str) -> Result<Self, CommandError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| CommandError::Malformed(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self::new(game_id, map.into_iter().collect())),
            other => Err(CommandError::Malformed(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Id of the game the command was issued to
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// String property, or `Malformed` naming the missing key.
    pub fn require_str(&self, key: &str) -> Result<&str, CommandError> {
        self.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::Malformed(format!("missing string field '{}'", key)))
    }
}

impl HasProperties for Command {
    fn properties(&self) -> Properties {
        self.properties.clone()
    }

    fn set_property(&self, _key: &str, _value: Value) -> Result<(), GameError> {
        Err(GameError::Immutable("command"))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

type ApplyFn = Box<dyn FnOnce(&Game) -> Result<(), GameError> + Send>;

/// A deferred unit of work applied to the game by the loop.
pub struct Action {
    description: Option<String>,
    apply: ApplyFn,
}

impl Action {
    pub fn new<F>(apply: F) -> Self
    where
        F: FnOnce(&Game) -> Result<(), GameError> + Send + 'static,
    {
        Self {
            description: None,
            apply: Box::new(apply),
        }
    }

    /// Attach a description for the game log.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn log_description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or("a generic action was performed")
    }

    pub fn apply(self, game: &Game) -> Result<(), GameError> {
        (self.apply)(game)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("description", &self.log_description())
            .finish_non_exhaustive()
    }
}
