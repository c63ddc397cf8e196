//! Room transport contract
//!
//! The real-time transport (participants, data channel, presence events) is
//! supplied by an external SDK. This crate describes the slice of it that the
//! command channel and presence tracking consume, so both can be driven by any
//! session implementation.
//!
//! [`LoopbackRoom`] is an in-process implementation used by tests and the demo
//! client.
//!
//! # Example
//!
//! ```
//! use room_transport::{LoopbackRoom, PublishOptions, Transport, TransportEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let room = LoopbackRoom::new();
//! let (agent, _agent_events) = room.join("agent-1");
//! let (_client, mut client_events) = room.join("student");
//!
//! agent.publish(b"hello".to_vec(), PublishOptions::reliable()).unwrap();
//!
//! while let Some(event) = client_events.recv().await {
//!     if let TransportEvent::DataReceived { payload, .. } = event {
//!         assert_eq!(payload, b"hello");
//!         break;
//!     }
//! }
//! # }
//! ```

mod error;
mod event;
mod loopback;

pub use error::TransportError;
pub use event::{DataPacketKind, Participant, PublishOptions, TransportEvent};
pub use loopback::{LoopbackRoom, LoopbackTransport, MAX_PACKET_BYTES};

/// Outbound half of a transport session.
///
/// Inbound traffic arrives as [`TransportEvent`]s on a channel handed out when
/// the session is opened.
pub trait Transport: Send + Sync {
    /// Identity of the local participant.
    fn local_identity(&self) -> &str;

    /// Publish a data packet to the other participants in the room.
    fn publish(&self, payload: Vec<u8>, options: PublishOptions) -> Result<(), TransportError>;

    /// Current participants, local participant included.
    fn participants(&self) -> Vec<Participant>;
}
