//! Presence state machine.
//!
//! Pure: every input carries the current time and nothing sleeps. The single
//! armed timer belongs to the state that armed it (the absence countdown to
//! `NotJoined`, the retry check to `Connecting`) and is cancelled on every
//! transition out of that state.

use std::collections::BTreeSet;
use std::time::Duration;

use room_transport::Participant;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::state::{ConnectionState, PresenceSnapshot};

pub const DEFAULT_ABSENCE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_AGENT_MARKER: &str = "agent";

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// How long the agent may be absent before a retry is offered.
    pub absence_timeout: Duration,
    /// How long a retry waits before re-checking the participant list.
    pub retry_delay: Duration,
    /// Participants whose identity contains this (case-insensitive) are agents.
    pub agent_marker: String,
    /// Act as though an agent is always present. For demos without an agent.
    pub simulate_agent: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            absence_timeout: DEFAULT_ABSENCE_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            agent_marker: DEFAULT_AGENT_MARKER.to_string(),
            simulate_agent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Offers a retry once the agent has been absent for the absence timeout.
    Absence,
    /// Re-checks the participant list after a user retry.
    RetryCheck,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    kind: TimerKind,
    deadline: Instant,
}

#[derive(Debug)]
pub struct PresenceMachine {
    config: PresenceConfig,
    marker: String,
    state: ConnectionState,
    retry_available: bool,
    /// Agents in the last participant list, minus those reported
    /// disconnected since.
    agents: BTreeSet<String>,
    timer: Option<Timer>,
}

impl PresenceMachine {
    pub fn new(config: PresenceConfig) -> Self {
        let marker = config.agent_marker.to_lowercase();
        Self {
            config,
            marker,
            state: ConnectionState::NotJoined,
            retry_available: false,
            agents: BTreeSet::new(),
            timer: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_available(&self) -> bool {
        self.retry_available
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        PresenceSnapshot {
            state: self.state,
            retry_available: self.retry_available,
        }
    }

    pub fn armed_timer(&self) -> Option<TimerKind> {
        self.timer.map(|t| t.kind)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    pub fn is_agent(&self, participant: &Participant) -> bool {
        !participant.is_local && self.identity_is_agent(&participant.identity)
    }

    fn identity_is_agent(&self, identity: &str) -> bool {
        identity.to_lowercase().contains(&self.marker)
    }

    /// Whether an agent is known to be in the room.
    pub fn agent_present(&self) -> bool {
        self.config.simulate_agent || !self.agents.is_empty()
    }

    /// The participant list was recomputed.
    pub fn participants_changed(&mut self, participants: &[Participant], now: Instant) {
        self.agents = participants
            .iter()
            .filter(|p| self.is_agent(p))
            .map(|p| p.identity.clone())
            .collect();
        trace!(
            participants = participants.len(),
            agents = self.agents.len(),
            "participants changed"
        );

        if self.agent_present() {
            self.transition(ConnectionState::Connected);
            self.retry_available = false;
        } else if self.state != ConnectionState::Connecting {
            self.transition(ConnectionState::NotJoined);
            self.arm(TimerKind::Absence, now + self.config.absence_timeout);
        }
    }

    /// The transport reported a participant disconnect. Agents force
    /// `Disconnected` without waiting for the participant list to catch up.
    pub fn participant_disconnected(&mut self, identity: &str) {
        if self.identity_is_agent(identity) {
            self.agents.remove(identity);
            self.transition(ConnectionState::Disconnected);
        }
    }

    /// User asked to retry. Accepted from `NotJoined` and `Disconnected`.
    pub fn retry(&mut self, now: Instant) -> bool {
        match self.state {
            ConnectionState::NotJoined | ConnectionState::Disconnected => {
                self.transition(ConnectionState::Connecting);
                self.retry_available = false;
                self.arm(TimerKind::RetryCheck, now + self.config.retry_delay);
                true
            }
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(state = %self.state, "ignoring retry");
                false
            }
        }
    }

    /// Run the armed timer if it is due. Returns whether one fired.
    pub fn fire_timers(&mut self, now: Instant) -> bool {
        let Some(timer) = self.timer else {
            return false;
        };
        if timer.deadline > now {
            return false;
        }
        self.timer = None;

        match timer.kind {
            TimerKind::Absence => {
                if self.state == ConnectionState::NotJoined && !self.agent_present() {
                    debug!("agent still absent, offering retry");
                    self.retry_available = true;
                }
            }
            TimerKind::RetryCheck => {
                if self.state == ConnectionState::Connecting {
                    if self.agent_present() {
                        self.transition(ConnectionState::Connected);
                        self.retry_available = false;
                    } else {
                        self.transition(ConnectionState::NotJoined);
                        self.arm(TimerKind::Absence, now + self.config.absence_timeout);
                    }
                }
            }
        }
        true
    }

    fn transition(&mut self, next: ConnectionState) {
        if next == self.state {
            return;
        }
        if let Some(timer) = self.timer.take() {
            trace!(kind = ?timer.kind, "cancelled timer on state change");
        }
        debug!(from = %self.state, to = %next, "agent presence transition");
        self.state = next;
    }

    fn arm(&mut self, kind: TimerKind, deadline: Instant) {
        self.timer = Some(Timer { kind, deadline });
    }
}
