//! `room demo`: a loopback room with a scripted tutor agent.
//!
//! The agent joins late, pushes a concept graph, asks the client to select a
//! node by label, reports an error and leaves. The client reacts the way a
//! UI would: it resolves labels against the last graph it saw, answers with
//! `node_selected`, and presses retry whenever retry is offered.

use std::sync::Arc;
use std::time::Duration;

use agent_presence::PresenceSnapshot;
use anyhow::{Context, Result};
use command_channel::{
    Action, Command, CommandChannel, Graph, GraphLink, GraphNode, reply::parse_agent_reply,
};
use room_transport::{LoopbackRoom, TransportEvent};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::session::RoomSession;

pub const AGENT_IDENTITY: &str = "agent-tutor";

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub agent_joins_after: Duration,
    pub run_for: Duration,
}

/// Replies a language model might produce for the scripted turns. The last
/// one is unusable and turns into a clarify that never leaves the agent.
const SCRIPTED_REPLIES: [&str; 3] = [
    "```json\n{\"action\": \"select_node_by_label\", \"label\": \"derivatives\"}\n```",
    "{\"action\": \"error\", \"message\": \"lesson content unavailable\"}",
    "Sure! Let me think about that.",
];

pub async fn run(config: ClientConfig, options: DemoOptions) -> Result<()> {
    let room = LoopbackRoom::new();
    let (transport, events) = room.join(config.identity.clone());
    let session = RoomSession::start(Arc::new(transport), events, &config);
    info!(session = %session.id(), agent = AGENT_IDENTITY, "waiting for the agent");

    let agent = tokio::spawn(scripted_agent(room.clone(), options.agent_joins_after));
    let outcome = drive_client(&session, options.run_for).await;

    agent.abort();
    session.end();
    outcome
}

async fn drive_client(session: &RoomSession, run_for: Duration) -> Result<()> {
    let mut commands = session.channel().subscribe();
    let mut presence = session.presence().subscribe();
    let deadline = Instant::now() + run_for;
    let mut graph: Option<Graph> = None;

    log_presence(&presence.borrow_and_update());

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => break,
            changed = presence.changed() => {
                changed.context("presence tracker stopped")?;
                let snapshot = *presence.borrow_and_update();
                log_presence(&snapshot);
                if snapshot.retry_available {
                    info!("retry offered, retrying");
                    session.retry();
                }
            }
            changed = commands.changed() => {
                changed.context("command channel closed")?;
                let Some(command) = commands.borrow_and_update().clone() else {
                    continue;
                };
                handle_command(session, &mut graph, command);
            }
        }
    }

    let diagnostics = session.channel().diagnostics();
    info!(count = diagnostics.len(), "demo finished");
    for diagnostic in diagnostics {
        info!(kind = ?diagnostic.kind, participant = ?diagnostic.participant, at = %diagnostic.at, "diagnostic");
    }
    Ok(())
}

fn log_presence(snapshot: &PresenceSnapshot) {
    info!(
        state = %snapshot.state,
        retry_available = snapshot.retry_available,
        "agent status"
    );
}

fn handle_command(session: &RoomSession, graph: &mut Option<Graph>, command: Command) {
    info!(action = command.action_name(), "command from agent");
    if let Some(g) = command.graph {
        info!(
            nodes = g.nodes.len(),
            center = g.center().map(|n| n.label.as_str()).unwrap_or("none"),
            "graph updated"
        );
        *graph = Some(g);
    }

    let Action::SelectNodeByLabel { label } = command.action else {
        return;
    };
    let Some(node) = graph.as_ref().and_then(|g| g.find_by_label(&label)) else {
        warn!(%label, "no node with that label");
        return;
    };

    let mut fields = Map::new();
    fields.insert("nodeId".into(), Value::from(node.id.as_str()));
    fields.insert("label".into(), Value::from(node.label.as_str()));
    if let Some(viz) = &node.viz_type {
        fields.insert("vizType".into(), Value::from(viz.as_str()));
    }
    match session.send("node_selected", fields) {
        Ok(()) => info!(node = %node.id, "selected node"),
        Err(e) => warn!(code = e.error_code(), error = %e, "failed to report selection"),
    }
}

pub fn calculus_graph() -> Graph {
    let node = |id: &str, label: &str, viz: Option<&str>| GraphNode {
        id: id.into(),
        label: label.into(),
        viz_type: viz.map(str::to_string),
    };
    let link = |source: &str, target: &str| GraphLink {
        source: source.into(),
        target: target.into(),
    };
    Graph {
        center_id: Some("limits".into()),
        nodes: vec![
            node("limits", "Limits", Some("epsilon_delta")),
            node("derivatives", "Derivatives", Some("tangent_line")),
            node("integrals", "Integrals", None),
        ],
        links: vec![link("limits", "derivatives"), link("derivatives", "integrals")],
    }
}

async fn scripted_agent(room: LoopbackRoom, joins_after: Duration) -> Result<()> {
    sleep(joins_after).await;
    let (transport, events) = room.join(AGENT_IDENTITY);
    let channel = Arc::new(CommandChannel::default());
    channel.attach(Arc::new(transport));
    let listener = tokio::spawn(agent_listener(events, channel.clone()));

    let show = Command::new(Action::Other {
        action: "show_graph".into(),
    })
    .with_graph(calculus_graph());
    // Commands are latest-wins on the client, so give each one time to land
    channel.send_command(&show)?;
    sleep(Duration::from_millis(500)).await;
    channel.send_command(&Command::new(Action::StartLesson))?;

    for reply in SCRIPTED_REPLIES {
        sleep(Duration::from_secs(1)).await;
        let command = parse_agent_reply(reply);
        if let Action::Clarify { question } = &command.action {
            info!(question = question.as_deref().unwrap_or(""), "agent would ask the user to clarify");
            continue;
        }
        channel.send_command(&command)?;
    }

    sleep(Duration::from_secs(2)).await;
    channel.send_command(&Command::new(Action::EndLesson))?;
    listener.abort();
    channel.detach();
    room.leave(AGENT_IDENTITY);
    info!("agent left the room");
    Ok(())
}

async fn agent_listener(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    channel: Arc<CommandChannel>,
) {
    while let Some(event) = events.recv().await {
        if let TransportEvent::DataReceived {
            payload,
            participant,
            kind,
            topic,
        } = event
        {
            if channel.receive(&payload, participant.as_deref(), kind, topic.as_deref()) {
                if let Some(command) = channel.last_command() {
                    info!(action = command.action_name(), from = ?participant, "agent received command");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use agent_presence::ConnectionState;
    use command_channel::codec;

    fn config() -> ClientConfig {
        ClientConfig::from_file(&FileConfig::default())
    }

    #[test]
    fn graph_resolves_spoken_labels() {
        let graph = calculus_graph();
        assert_eq!(graph.center().map(|n| n.label.as_str()), Some("Limits"));
        assert_eq!(
            graph.find_by_label(" derivatives ").map(|n| n.id.as_str()),
            Some("derivatives")
        );
    }

    #[test]
    fn scripted_replies_parse() {
        let actions: Vec<String> = SCRIPTED_REPLIES
            .iter()
            .map(|r| parse_agent_reply(r).action_name().to_string())
            .collect();
        assert_eq!(actions, vec!["select_node_by_label", "error", "clarify"]);
    }

    #[tokio::test(start_paused = true)]
    async fn client_answers_label_selection() {
        let room = LoopbackRoom::new();
        let (transport, events) = room.join("student");
        let session = RoomSession::start(Arc::new(transport), events, &config());
        let (_peer, mut peer_events) = room.join("observer");

        let agent = tokio::spawn(scripted_agent(room.clone(), Duration::from_secs(1)));
        drive_client(&session, Duration::from_secs(10)).await.unwrap();
        agent.await.unwrap().unwrap();

        let mut sent_by_student = Vec::new();
        while let Ok(event) = peer_events.try_recv() {
            if let TransportEvent::DataReceived {
                payload,
                participant,
                ..
            } = event
            {
                if participant.as_deref() == Some("student") {
                    sent_by_student.push(codec::decode(&payload).unwrap());
                }
            }
        }
        assert_eq!(sent_by_student.len(), 1);
        assert_eq!(
            sent_by_student[0].action,
            Action::NodeSelected {
                node_id: Some("derivatives".into()),
                label: Some("Derivatives".into()),
                description: None,
                viz_type: Some("tangent_line".into()),
            }
        );
        assert_eq!(
            sent_by_student[0].session_id.as_deref(),
            Some(session.session_id())
        );

        // The agent's error report is recorded, and the agent has left
        let diagnostics = session.channel().diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            session.presence().snapshot().state,
            ConnectionState::NotJoined
        );
    }
}
