use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the UI shows about the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    NotJoined,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotJoined => write!(f, "not_joined"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl FromStr for ConnectionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_joined" => Ok(Self::NotJoined),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            _ => Err(format!("unknown connection state: {s}")),
        }
    }
}

/// State plus whether the UI should offer a retry button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub state: ConnectionState,
    pub retry_available: bool,
}

impl Default for PresenceSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::NotJoined,
            retry_available: false,
        }
    }
}
