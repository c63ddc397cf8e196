//! Helpers behind `room encode` and `room decode`.

use anyhow::{Context, Result, bail};
use command_channel::{Command, codec};
use serde_json::{Map, Value};

/// Parse `key=value`. The value is read as JSON when it parses, otherwise
/// taken as a plain string, so `count=3` is a number and `label=Limits` a string.
pub fn parse_field(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("field must look like key=value, got {raw:?}");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("field {raw:?} has an empty key");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

/// Build the wire frame `room encode` prints.
pub fn encode_frame(action: &str, fields: &[String]) -> Result<String> {
    if action.is_empty() {
        bail!("action must not be empty");
    }
    let mut map = Map::new();
    for raw in fields {
        let (key, value) = parse_field(raw)?;
        map.insert(key, value);
    }
    let payload = codec::outbound_payload(action, map);
    let command = Command::from_payload(payload).context("invalid command")?;
    let bytes = codec::encode(&command).context("failed to encode command")?;
    String::from_utf8(bytes).context("encoded frame is not UTF-8")
}

/// Result of `room decode`: either the command's payload or the reason the
/// frame would be dropped.
pub fn decode_frame(frame: &str) -> Result<Value, &'static str> {
    let command = codec::decode(frame.as_bytes()).map_err(|e| e.error_code())?;
    command
        .to_payload()
        .map(Value::Object)
        .map_err(|_| "unencodable")
}
