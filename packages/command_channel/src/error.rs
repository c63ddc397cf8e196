//! Error types for building, decoding, and sending commands.

use room_transport::TransportError;

/// A payload that cannot be turned into a [`crate::Command`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("payload has no action")]
    MissingAction,

    #[error("{action} requires a non-empty {field}")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("{action} is a recognised action and cannot be sent untyped")]
    ReservedAction { action: String },

    #[error("extra field {field} would be read back as a typed field")]
    ReservedField { field: String },
}

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("frame is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame kind is {kind:?}, expected \"command\"")]
    NotCommand { kind: Option<String> },

    #[error("frame payload has no action")]
    MissingAction,

    #[error("invalid command: {0}")]
    InvalidCommand(CommandError),
}

impl FrameError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::Malformed(_) => "malformed_json",
            Self::NotCommand { .. } => "not_a_command",
            Self::MissingAction => "missing_action",
            Self::InvalidCommand(_) => "invalid_command",
        }
    }
}

impl From<CommandError> for FrameError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::MissingAction => Self::MissingAction,
            other => Self::InvalidCommand(other),
        }
    }
}

/// Outbound failures. These always reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no active transport session")]
    NoActiveSession,

    #[error("action must not be empty")]
    EmptyAction,

    #[error("{action} commands are never published")]
    NotPublishable { action: String },

    #[error(transparent)]
    InvalidCommand(#[from] CommandError),

    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ChannelError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no_active_session",
            Self::EmptyAction => "empty_action",
            Self::NotPublishable { .. } => "not_publishable",
            Self::InvalidCommand(_) => "invalid_command",
            Self::Serialize(_) => "serialize_failed",
            Self::Transport(e) => e.error_code(),
        }
    }
}
