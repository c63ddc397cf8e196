//! Command channel bound to one transport session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use room_transport::{DataPacketKind, PublishOptions, Transport};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::codec;
use crate::command::{Action, Command};
use crate::diagnostics::{DEFAULT_CAPACITY, Diagnostic, DiagnosticKind, DiagnosticLog};
use crate::error::ChannelError;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// When set, inbound frames tagged with a different topic are ignored and
    /// outbound frames carry this topic.
    pub topic: Option<String>,
    pub diagnostics_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            topic: None,
            diagnostics_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Decodes inbound frames into the latest [`Command`] and publishes outbound
/// commands on the reliable data channel.
///
/// Only the most recent command is kept. Subscribers get a `watch` receiver,
/// so a reader that falls behind sees the newest command, never a backlog.
pub struct CommandChannel {
    config: ChannelConfig,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    last: watch::Sender<Option<Command>>,
    diagnostics: Mutex<DiagnosticLog>,
}

impl CommandChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let (last, _) = watch::channel(None);
        let diagnostics = Mutex::new(DiagnosticLog::new(config.diagnostics_capacity));
        Self {
            config,
            transport: RwLock::new(None),
            last,
            diagnostics,
        }
    }

    /// Bind the channel to the active session, replacing any previous one.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        debug!(local = %transport.local_identity(), "command channel attached");
        *self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    /// Drop the session binding. Returns whether one was attached.
    pub fn detach(&self) -> bool {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("command channel detached");
        }
        previous.is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Command>> {
        self.last.subscribe()
    }

    pub fn last_command(&self) -> Option<Command> {
        self.last.borrow().clone()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock_diagnostics().entries().cloned().collect()
    }

    /// Handle one inbound data packet.
    ///
    /// Never fails: malformed frames are logged, recorded as diagnostics and
    /// dropped, leaving the last command untouched. Returns whether the frame
    /// produced a new command.
    pub fn receive(
        &self,
        payload: &[u8],
        participant: Option<&str>,
        kind: DataPacketKind,
        topic: Option<&str>,
    ) -> bool {
        if let (Some(wanted), Some(topic)) = (self.config.topic.as_deref(), topic) {
            if !topic.is_empty() && topic != wanted {
                debug!(topic, wanted, "ignoring frame on another topic");
                return false;
            }
        }

        let command = match codec::decode(payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    participant = participant.unwrap_or("unknown"),
                    %kind,
                    code = e.error_code(),
                    error = %e,
                    "dropping malformed command frame"
                );
                self.lock_diagnostics().push(
                    DiagnosticKind::MalformedFrame {
                        code: e.error_code(),
                        detail: e.to_string(),
                    },
                    participant.map(str::to_string),
                );
                return false;
            }
        };

        if let Action::Error { message } = &command.action {
            warn!(
                participant = participant.unwrap_or("unknown"),
                message = message.as_deref().unwrap_or(""),
                "agent reported an error"
            );
            self.lock_diagnostics().push(
                DiagnosticKind::AgentError {
                    message: message.clone(),
                },
                participant.map(str::to_string),
            );
        }

        debug!(action = command.action_name(), "command received");
        self.last.send_replace(Some(command));
        true
    }

    /// Send `action` with loose fields. Fields that are not strings, numbers
    /// or booleans are dropped, except a `graph` object.
    pub fn send(&self, action: &str, fields: Map<String, Value>) -> Result<(), ChannelError> {
        if action.is_empty() {
            return Err(ChannelError::EmptyAction);
        }
        let command = Command::from_payload(codec::outbound_payload(action, fields))?;
        self.send_command(&command)
    }

    /// Encode and publish a command on the reliable channel.
    pub fn send_command(&self, command: &Command) -> Result<(), ChannelError> {
        let transport = self
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ChannelError::NoActiveSession)?;

        if command.action_name().is_empty() {
            return Err(ChannelError::EmptyAction);
        }
        command.validate()?;
        if !command.action.is_published() {
            return Err(ChannelError::NotPublishable {
                action: command.action_name().to_string(),
            });
        }

        let bytes = codec::encode(command)?;
        let options = PublishOptions::reliable().with_topic(self.config.topic.clone());
        transport.publish(bytes, options)?;
        debug!(action = command.action_name(), "command sent");
        Ok(())
    }

    fn lock_diagnostics(&self) -> MutexGuard<'_, DiagnosticLog> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CommandChannel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}
