//! One room membership: command channel + presence tracking fed by a single
//! transport event subscription.

use std::sync::Arc;

use agent_presence::{PresenceHandle, PresenceSender};
use command_channel::{ChannelError, CommandChannel};
use room_transport::{Transport, TransportEvent};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::config::ClientConfig;

pub struct RoomSession {
    id: Uuid,
    session_id: String,
    channel: Arc<CommandChannel>,
    presence: PresenceHandle,
    pump: JoinHandle<()>,
}

impl RoomSession {
    /// Attach to an open transport session. `events` is the session's only
    /// subscription; it is released when the session ends.
    pub fn start(
        transport: Arc<dyn Transport>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        config: &ClientConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| id.to_string());
        info!(%id, %session_id, local = %transport.local_identity(), "room session started");

        let channel = Arc::new(CommandChannel::new(config.channel.clone()));
        channel.attach(transport.clone());

        let presence = PresenceHandle::spawn(config.presence.clone(), transport.participants());
        let span = info_span!("room_session", %id);
        let pump = tokio::spawn(
            pump_events(events, channel.clone(), presence.sender()).instrument(span),
        );

        Self {
            id,
            session_id,
            channel,
            presence,
            pump,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    pub fn presence(&self) -> &PresenceHandle {
        &self.presence
    }

    /// Send a command tagged with this session's id (unless the caller
    /// already set `sessionId`).
    pub fn send(&self, action: &str, mut fields: Map<String, Value>) -> Result<(), ChannelError> {
        fields
            .entry("sessionId")
            .or_insert_with(|| Value::from(self.session_id.as_str()));
        self.channel.send(action, fields)
    }

    /// User pressed retry.
    pub fn retry(&self) {
        if self.presence.retry().is_err() {
            debug!(id = %self.id, "retry after presence tracker stopped");
        }
    }

    /// Tear down: stop the event pump, detach the channel, stop presence timers.
    pub fn end(self) {
        info!(id = %self.id, "room session ended");
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.pump.abort();
        self.channel.detach();
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    channel: Arc<CommandChannel>,
    presence: PresenceSender,
) {
    while let Some(event) = events.recv().await {
        let delivered = match event {
            TransportEvent::DataReceived {
                payload,
                participant,
                kind,
                topic,
            } => {
                channel.receive(&payload, participant.as_deref(), kind, topic.as_deref());
                Ok(())
            }
            TransportEvent::ParticipantsChanged(participants) => {
                presence.participants_changed(participants)
            }
            TransportEvent::ParticipantDisconnected { identity } => {
                presence.participant_disconnected(identity)
            }
        };
        if delivered.is_err() {
            debug!("presence tracker stopped, ending event pump");
            break;
        }
    }
    debug!("transport event stream ended");
}
