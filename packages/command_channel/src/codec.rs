//! Frame codec.
//!
//! Wire format: one UTF-8 JSON document per data packet, no length prefix
//! (the transport already delivers whole messages).
//!
//! Envelope: `{ "kind": "command", "payload": { "action": "...", ... } }`

use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::{COMMAND_KIND, Command, is_primitive};
use crate::error::FrameError;

#[derive(Serialize)]
struct Envelope<'a> {
    kind: &'a str,
    payload: Map<String, Value>,
}

/// Serialize a command into frame bytes.
pub fn encode(command: &Command) -> Result<Vec<u8>, serde_json::Error> {
    let envelope = Envelope {
        kind: COMMAND_KIND,
        payload: command.to_payload()?,
    };
    serde_json::to_vec(&envelope)
}

/// Parse frame bytes into a command.
pub fn decode(frame: &[u8]) -> Result<Command, FrameError> {
    let text = std::str::from_utf8(frame)?;
    let value: Value = serde_json::from_str(text)?;

    let Value::Object(mut envelope) = value else {
        return Err(FrameError::NotCommand { kind: None });
    };

    match envelope.get("kind") {
        Some(Value::String(kind)) if kind == COMMAND_KIND => {}
        Some(Value::String(kind)) => {
            return Err(FrameError::NotCommand {
                kind: Some(kind.clone()),
            });
        }
        _ => return Err(FrameError::NotCommand { kind: None }),
    }

    let Some(Value::Object(payload)) = envelope.remove("payload") else {
        return Err(FrameError::MissingAction);
    };

    Ok(Command::from_payload(payload)?)
}

/// Payload for an outbound `action` plus loose fields.
///
/// Keeps string, number and boolean fields. `graph` is kept as-is so it can be
/// parsed structurally; every other object, array or null is dropped. An
/// `action` key inside `fields` never overrides `action`.
pub fn outbound_payload(action: &str, fields: Map<String, Value>) -> Map<String, Value> {
    let mut payload: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, value)| is_primitive(value) || (key == "graph" && value.is_object()))
        .collect();
    payload.insert("action".into(), Value::from(action));
    payload
}
