//! Events and options exchanged with the transport session.

use std::fmt;

/// A member of the room as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    pub identity: String,
    /// True for the participant this session belongs to.
    pub is_local: bool,
}

impl Participant {
    pub fn local(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_local: true,
        }
    }

    pub fn remote(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_local: false,
        }
    }
}

/// Delivery guarantee of a data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataPacketKind {
    /// Ordered, retransmitted on loss.
    Reliable,
    /// Unordered, may be dropped.
    Lossy,
}

impl fmt::Display for DataPacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => write!(f, "reliable"),
            Self::Lossy => write!(f, "lossy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub reliable: bool,
    pub topic: Option<String>,
}

impl PublishOptions {
    pub fn reliable() -> Self {
        Self {
            reliable: true,
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic;
        self
    }

    pub fn kind(&self) -> DataPacketKind {
        if self.reliable {
            DataPacketKind::Reliable
        } else {
            DataPacketKind::Lossy
        }
    }
}

/// Everything the transport delivers to a session, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A participant published a data packet.
    DataReceived {
        payload: Vec<u8>,
        /// Sender identity, when the transport knows it.
        participant: Option<String>,
        kind: DataPacketKind,
        topic: Option<String>,
    },
    /// The participant list changed. Carries the full current list.
    ParticipantsChanged(Vec<Participant>),
    /// A remote participant disconnected.
    ParticipantDisconnected { identity: String },
}
