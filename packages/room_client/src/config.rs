use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use agent_presence::PresenceConfig;
use command_channel::ChannelConfig;

// =============================================================================
// File config (figment-deserialized from defaults / room.toml / env vars)
// =============================================================================
//
//   room.toml:       [presence]
//                    absence_timeout_secs = 45
//
//   env var:         ROOM_PRESENCE__ABSENCE_TIMEOUT_SECS=45   (double underscore = nesting)

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "room.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub room: RoomFileConfig,
    #[serde(default)]
    pub presence: PresenceFileConfig,
    #[serde(default)]
    pub channel: ChannelFileConfig,
}

/// Session identity (lives under `[room]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomFileConfig {
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Attached to outbound commands as `sessionId`. Generated when unset.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Default for RoomFileConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            session_id: None,
        }
    }
}

/// Agent presence tunables (lives under `[presence]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresenceFileConfig {
    #[serde(default = "default_absence_timeout_secs")]
    pub absence_timeout_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_agent_marker")]
    pub agent_marker: String,
    #[serde(default)]
    pub simulate_agent: bool,
}

impl Default for PresenceFileConfig {
    fn default() -> Self {
        Self {
            absence_timeout_secs: default_absence_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            agent_marker: default_agent_marker(),
            simulate_agent: false,
        }
    }
}

/// Command channel tunables (lives under `[channel]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelFileConfig {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
}

impl Default for ChannelFileConfig {
    fn default() -> Self {
        Self {
            topic: None,
            diagnostics_capacity: default_diagnostics_capacity(),
        }
    }
}

fn default_identity() -> String {
    "student".to_string()
}
fn default_absence_timeout_secs() -> u64 {
    30
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_agent_marker() -> String {
    "agent".to_string()
}
fn default_diagnostics_capacity() -> usize {
    64
}

/// Build a figment that layers: defaults → config file → ROOM_* env vars.
pub fn load_config(path: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("ROOM_").split("__"))
}

// =============================================================================
// Runtime config
// =============================================================================

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub identity: String,
    pub session_id: Option<String>,
    pub presence: PresenceConfig,
    pub channel: ChannelConfig,
}

impl ClientConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            identity: fc.room.identity.clone(),
            session_id: fc.room.session_id.clone(),
            presence: PresenceConfig {
                absence_timeout: Duration::from_secs(fc.presence.absence_timeout_secs),
                retry_delay: Duration::from_secs(fc.presence.retry_delay_secs),
                agent_marker: fc.presence.agent_marker.clone(),
                simulate_agent: fc.presence.simulate_agent,
            },
            channel: ChannelConfig {
                topic: fc.channel.topic.clone().filter(|t| !t.is_empty()),
                diagnostics_capacity: fc.channel.diagnostics_capacity,
            },
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc: FileConfig = load_config(path)
            .extract()
            .context("invalid room client configuration")?;
        Ok(Self::from_file(&fc))
    }
}
