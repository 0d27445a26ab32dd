//! Message shapes exchanged with player programs.
//!
//! Three shapes cross the per-player channel: a [`StateUpdate`] goes out to
//! the player, a [`PlayerAction`] wrapping a [`Command`] comes back. On the
//! wire each message is one JSON document per line, UTF-8, snake_case field
//! names, flushed immediately after write.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;

/// A command sent by a player to act on the game.
///
/// Arguments are untyped JSON values; the typed accessors coerce one
/// argument at a given index and fail with a [`ProtocolError`] when the
/// index is out of range or the value does not convert. Coercion never
/// mutates the argument list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `"move"`.
    pub name: String,
    /// Ordered, untyped arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Command {
    /// Command with the given name and arguments.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Command {
            name: name.into(),
            args,
        }
    }

    fn arg(&self, index: usize) -> Result<&Value, ProtocolError> {
        self.args.get(index).ok_or_else(|| ProtocolError::MissingArgument {
            name: self.name.clone(),
            index,
        })
    }

    fn invalid(&self, index: usize, expected: &'static str) -> ProtocolError {
        ProtocolError::InvalidArgument {
            name: self.name.clone(),
            index,
            expected,
        }
    }

    /// Argument at `index` as a string.
    ///
    /// Strings pass through; numbers and booleans are stringified.
    pub fn as_str(&self, index: usize) -> Result<String, ProtocolError> {
        match self.arg(index)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.invalid(index, "a string")),
        }
    }

    /// Argument at `index` as an integer. Numeric strings convert too.
    pub fn as_int(&self, index: usize) -> Result<i64, ProtocolError> {
        match self.arg(index)? {
            Value::Number(n) => n.as_i64().ok_or_else(|| self.invalid(index, "an int")),
            Value::String(s) => s.trim().parse().map_err(|_| self.invalid(index, "an int")),
            _ => Err(self.invalid(index, "an int")),
        }
    }

    /// Argument at `index` as a single-precision float.
    pub fn as_float(&self, index: usize) -> Result<f32, ProtocolError> {
        self.as_double(index).map(|d| d as f32)
    }

    /// Argument at `index` as a double-precision float. Numeric strings
    /// convert too.
    pub fn as_double(&self, index: usize) -> Result<f64, ProtocolError> {
        match self.arg(index)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.invalid(index, "a double")),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid(index, "a double")),
            _ => Err(self.invalid(index, "a double")),
        }
    }

    /// Argument at `index` as a boolean. `"true"`/`"false"` strings convert
    /// too, case-insensitively.
    pub fn as_bool(&self, index: usize) -> Result<bool, ProtocolError> {
        match self.arg(index)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.invalid(index, "a boolean")),
            },
            _ => Err(self.invalid(index, "a boolean")),
        }
    }
}

/// One inbound turn payload from a player.
///
/// `command` is absent only for malformed or empty input, which the channel
/// layer treats as a protocol fault before the action ever reaches game
/// logic. `messages` are free-form debug log lines emitted by the player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    /// The command to execute, when the payload parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    /// Debug log lines from the player.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl PlayerAction {
    /// Action wrapping `command`, with no log lines.
    pub fn new(command: Command) -> Self {
        PlayerAction {
            command: Some(command),
            messages: Vec::new(),
        }
    }

    /// Append a debug log line.
    pub fn log(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

/// Outbound message describing a change in the authoritative game state,
/// directed at one player.
///
/// Both fields are always present on the wire; a `null` payload is legal
/// and serializes explicitly, never omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Update discriminator understood by the player wrapper.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Untyped update payload.
    pub payload: Value,
}

impl StateUpdate {
    /// Update with the given discriminator and payload.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        StateUpdate {
            kind: Some(kind.into()),
            payload,
        }
    }

    /// The `{"type": null, "payload": null}` update, substituted when a
    /// game supplies no update for a player.
    pub fn empty() -> Self {
        StateUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_coerce_by_index() {
        let command = Command::new("move", vec![json!(3), json!("north")]);
        assert_eq!(command.as_int(0).unwrap(), 3);
        assert_eq!(command.as_str(1).unwrap(), "north");
        assert!(matches!(
            command.as_int(5),
            Err(ProtocolError::MissingArgument { index: 5, .. })
        ));
    }

    #[test]
    fn numeric_strings_coerce_to_numbers() {
        let command = Command::new("bid", vec![json!("42"), json!("2.5"), json!("TRUE")]);
        assert_eq!(command.as_int(0).unwrap(), 42);
        assert_eq!(command.as_double(1).unwrap(), 2.5);
        assert!(command.as_bool(2).unwrap());
    }

    #[test]
    fn mismatched_values_fail_coercion() {
        let command = Command::new("move", vec![json!("north"), json!([1, 2])]);
        assert!(command.as_int(0).is_err());
        assert!(command.as_str(1).is_err());
        assert!(command.as_bool(0).is_err());
        // coercion does not mutate
        assert_eq!(command.args.len(), 2);
    }

    #[test]
    fn empty_state_update_serializes_explicit_nulls() {
        let json = serde_json::to_string(&StateUpdate::empty()).unwrap();
        assert_eq!(json, r#"{"type":null,"payload":null}"#);
    }

    #[test]
    fn state_update_round_trips() {
        let update = StateUpdate::new("full", json!({"board": [0, 1, 2]}));
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains(r#""type":"full""#));
        let back: StateUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn player_action_parses_from_wire_form() {
        let line = r#"{"command":{"name":"move","args":[1,"east"]},"messages":["thinking"]}"#;
        let action: PlayerAction = serde_json::from_str(line).unwrap();
        let command = action.command.unwrap();
        assert_eq!(command.name, "move");
        assert_eq!(command.as_str(1).unwrap(), "east");
        assert_eq!(action.messages, vec!["thinking"]);
    }
}
