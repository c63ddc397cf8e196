//! Task that owns a [`PresenceMachine`] for the lifetime of a room session.
//!
//! Inputs arrive over an mpsc channel, the armed timer is a `sleep_until` on
//! the machine's next deadline, and snapshots are published through `watch`.
//! Dropping the handle aborts the task, which drops any armed timer with it.

use room_transport::Participant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::machine::{PresenceConfig, PresenceMachine};
use crate::state::PresenceSnapshot;

#[derive(Debug)]
pub enum PresenceInput {
    Participants(Vec<Participant>),
    Disconnected { identity: String },
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    #[error("presence tracker has stopped")]
    Stopped,
}

/// Cloneable input side of a presence task.
#[derive(Clone)]
pub struct PresenceSender {
    inputs: mpsc::UnboundedSender<PresenceInput>,
}

impl PresenceSender {
    pub fn participants_changed(&self, participants: Vec<Participant>) -> Result<(), PresenceError> {
        self.send(PresenceInput::Participants(participants))
    }

    pub fn participant_disconnected(&self, identity: impl Into<String>) -> Result<(), PresenceError> {
        self.send(PresenceInput::Disconnected {
            identity: identity.into(),
        })
    }

    pub fn retry(&self) -> Result<(), PresenceError> {
        self.send(PresenceInput::Retry)
    }

    pub fn send(&self, input: PresenceInput) -> Result<(), PresenceError> {
        self.inputs.send(input).map_err(|_| PresenceError::Stopped)
    }
}

/// Handle to a running presence task.
pub struct PresenceHandle {
    sender: PresenceSender,
    snapshots: watch::Receiver<PresenceSnapshot>,
    task: JoinHandle<()>,
}

impl PresenceHandle {
    /// Start tracking, seeded with the participants present at session start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: PresenceConfig, initial: Vec<Participant>) -> Self {
        let mut machine = PresenceMachine::new(config);
        machine.participants_changed(&initial, Instant::now());

        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let (inputs, input_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(machine, input_rx, snapshot_tx));

        Self {
            sender: PresenceSender { inputs },
            snapshots,
            task,
        }
    }

    pub fn sender(&self) -> PresenceSender {
        self.sender.clone()
    }

    pub fn participants_changed(&self, participants: Vec<Participant>) -> Result<(), PresenceError> {
        self.sender.participants_changed(participants)
    }

    pub fn participant_disconnected(&self, identity: impl Into<String>) -> Result<(), PresenceError> {
        self.sender.participant_disconnected(identity)
    }

    pub fn retry(&self) -> Result<(), PresenceError> {
        self.sender.retry()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        *self.snapshots.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceSnapshot> {
        self.snapshots.clone()
    }

    /// Stop tracking. Equivalent to dropping the handle.
    pub fn shutdown(self) {
        debug!("presence tracker shutting down");
    }
}

impl Drop for PresenceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut machine: PresenceMachine,
    mut inputs: mpsc::UnboundedReceiver<PresenceInput>,
    snapshots: watch::Sender<PresenceSnapshot>,
) {
    loop {
        let deadline = machine.next_deadline();
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else {
                    debug!("presence input channel closed");
                    break;
                };
                let now = Instant::now();
                match input {
                    PresenceInput::Participants(list) => machine.participants_changed(&list, now),
                    PresenceInput::Disconnected { identity } => {
                        machine.participant_disconnected(&identity)
                    }
                    PresenceInput::Retry => {
                        machine.retry(now);
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                machine.fire_timers(Instant::now());
            }
        }

        let next = machine.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(
                state = %next.state,
                retry_available = next.retry_available,
                "agent presence updated"
            );
            *current = next;
            true
        });
    }
}
