//! In-process room: every member gets an event channel, published packets
//! fan out to the other members in send order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
    DataPacketKind, Participant, PublishOptions, Transport, TransportError, TransportEvent,
};

/// Largest packet the loopback room accepts, in line with the reliable
/// data channel limits of hosted room services.
pub const MAX_PACKET_BYTES: usize = 64 * 1024;

struct Member {
    identity: String,
    events: mpsc::UnboundedSender<TransportEvent>,
}

#[derive(Default)]
struct RoomState {
    /// Join order.
    members: Vec<Member>,
}

impl RoomState {
    fn participants_for(&self, viewer: &str) -> Vec<Participant> {
        self.members
            .iter()
            .map(|m| Participant {
                identity: m.identity.clone(),
                is_local: m.identity == viewer,
            })
            .collect()
    }

    fn broadcast_participants(&self) {
        for member in &self.members {
            let list = self.participants_for(&member.identity);
            // A closed receiver just means that member stopped listening
            let _ = member
                .events
                .send(TransportEvent::ParticipantsChanged(list));
        }
    }
}

/// Shared hub for a set of loopback sessions.
#[derive(Clone, Default)]
pub struct LoopbackRoom {
    state: Arc<Mutex<RoomState>>,
}

impl LoopbackRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the room. Rejoining with an identity that is already present
    /// replaces the old session.
    pub fn join(
        &self,
        identity: impl Into<String>,
    ) -> (LoopbackTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let identity = identity.into();
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = lock(&self.state);
            state.members.retain(|m| m.identity != identity);
            state.members.push(Member {
                identity: identity.clone(),
                events: tx,
            });
            debug!(%identity, members = state.members.len(), "participant joined loopback room");
            state.broadcast_participants();
        }
        let transport = LoopbackTransport {
            identity,
            state: self.state.clone(),
        };
        (transport, rx)
    }

    /// Remove a participant. Remaining members see a disconnect notification
    /// first, then the updated participant list.
    pub fn leave(&self, identity: &str) -> bool {
        let mut state = lock(&self.state);
        let before = state.members.len();
        state.members.retain(|m| m.identity != identity);
        if state.members.len() == before {
            return false;
        }
        debug!(%identity, members = state.members.len(), "participant left loopback room");
        for member in &state.members {
            let _ = member.events.send(TransportEvent::ParticipantDisconnected {
                identity: identity.to_string(),
            });
        }
        state.broadcast_participants();
        true
    }

    pub fn len(&self) -> usize {
        lock(&self.state).members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One member's handle on a [`LoopbackRoom`].
#[derive(Clone)]
pub struct LoopbackTransport {
    identity: String,
    state: Arc<Mutex<RoomState>>,
}

impl Transport for LoopbackTransport {
    fn local_identity(&self) -> &str {
        &self.identity
    }

    fn publish(&self, payload: Vec<u8>, options: PublishOptions) -> Result<(), TransportError> {
        let state = lock(&self.state);
        if !state.members.iter().any(|m| m.identity == self.identity) {
            return Err(TransportError::Closed);
        }
        if payload.len() > MAX_PACKET_BYTES {
            return Err(TransportError::Rejected(format!(
                "packet of {} bytes exceeds the {MAX_PACKET_BYTES} byte limit",
                payload.len()
            )));
        }
        let kind: DataPacketKind = options.kind();
        trace!(from = %self.identity, bytes = payload.len(), %kind, "loopback publish");
        for member in state.members.iter().filter(|m| m.identity != self.identity) {
            let _ = member.events.send(TransportEvent::DataReceived {
                payload: payload.clone(),
                participant: Some(self.identity.clone()),
                kind,
                topic: options.topic.clone(),
            });
        }
        Ok(())
    }

    fn participants(&self) -> Vec<Participant> {
        lock(&self.state).participants_for(&self.identity)
    }
}

fn lock(state: &Mutex<RoomState>) -> MutexGuard<'_, RoomState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
