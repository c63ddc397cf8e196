//! Agent presence tracking for a room session.
//!
//! Derives a small UI-facing [`ConnectionState`] from the room's participant
//! list and disconnect notifications:
//!
//! - an agent participant present → `Connected`
//! - no agent → `NotJoined`, with a retry offered after the absence timeout
//! - an agent disconnect notification → `Disconnected`
//! - a user retry → `Connecting`, re-checked after the retry delay
//!
//! [`PresenceMachine`] is the pure state machine; [`PresenceHandle`] runs one
//! on a tokio task with real timers.

mod actor;
pub mod machine;
pub mod state;

pub use actor::{PresenceError, PresenceHandle, PresenceInput, PresenceSender};
pub use machine::{PresenceConfig, PresenceMachine, TimerKind};
pub use state::{ConnectionState, PresenceSnapshot};
