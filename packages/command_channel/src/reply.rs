//! Turning a language model's reply into a command.
//!
//! The agent asks a model to map the user's transcript onto a command object.
//! Models like to wrap JSON in Markdown fences and sometimes answer with
//! something else entirely; anything unusable becomes a clarify command.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::command::{Action, Command};

pub const CLARIFY_FALLBACK: &str = "I didn't understand that. Can you rephrase?";

/// Strip a surrounding Markdown code fence (optionally tagged `json`).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split("```").next().unwrap_or(rest);
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

/// Parse a model reply. Never fails: unparseable or invalid replies fall back
/// to [`CLARIFY_FALLBACK`].
pub fn parse_agent_reply(text: &str) -> Command {
    let body = strip_code_fence(text);
    let parsed = serde_json::from_str::<Map<String, Value>>(body)
        .map_err(|e| e.to_string())
        .and_then(|payload| Command::from_payload(payload).map_err(|e| e.to_string()));

    match parsed {
        Ok(command) => {
            debug!(action = command.action_name(), "parsed agent reply");
            command
        }
        Err(error) => {
            warn!(%error, reply = body, "agent reply is not a usable command");
            clarify(CLARIFY_FALLBACK)
        }
    }
}

pub fn clarify(question: impl Into<String>) -> Command {
    Command::new(Action::Clarify {
        question: Some(question.into()),
    })
}
