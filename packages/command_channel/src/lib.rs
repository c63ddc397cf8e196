//! Typed command protocol between a room client and a remote agent.
//!
//! Commands travel as one UTF-8 JSON document per data packet:
//!
//! ```json
//! { "kind": "command", "payload": { "action": "node_selected", "nodeId": "limits" } }
//! ```
//!
//! [`codec`] translates between [`Command`] values and frames. [`CommandChannel`]
//! binds the codec to a transport session: inbound frames update the most
//! recent command (malformed ones are logged and dropped), outbound commands
//! are published on the reliable channel.

pub mod channel;
pub mod codec;
pub mod command;
pub mod diagnostics;
pub mod error;
pub mod reply;

pub use channel::{ChannelConfig, CommandChannel};
pub use command::{Action, Command, Graph, GraphLink, GraphNode};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use error::{ChannelError, CommandError, FrameError};
