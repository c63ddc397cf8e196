use proptest::prelude::*;
use serde_json::{Map, Value, json};

use command_channel::codec::{decode, encode, outbound_payload};
use command_channel::{Action, ChannelConfig, Command, CommandChannel, Graph, GraphLink, GraphNode};
use room_transport::DataPacketKind;

const RECOGNISED: &[&str] = &[
    "navigate",
    "node_selected",
    "select_node_by_label",
    "back_to_graph",
    "start_lesson",
    "end_lesson",
    "error",
    "clarify",
];

// --- Generators ---

fn arb_text() -> impl Strategy<Value = String> {
    "[ -~]{0,16}"
}

fn arb_opt_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(arb_text())
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (arb_opt_text(), arb_opt_text())
            .prop_map(|(node_id, label)| Action::Navigate { node_id, label }),
        (arb_opt_text(), arb_opt_text(), arb_opt_text(), arb_opt_text()).prop_map(
            |(node_id, label, description, viz_type)| Action::NodeSelected {
                node_id,
                label,
                description,
                viz_type,
            }
        ),
        "[ -~]{1,16}".prop_map(|label| Action::SelectNodeByLabel { label }),
        Just(Action::BackToGraph),
        Just(Action::StartLesson),
        Just(Action::EndLesson),
        arb_opt_text().prop_map(|message| Action::Error { message }),
        arb_opt_text().prop_map(|question| Action::Clarify { question }),
        "[a-z_]{1,12}"
            .prop_filter("recognised action name", |name| !RECOGNISED.contains(
                &name.as_str()
            ))
            .prop_map(|action| Action::Other { action }),
    ]
}

fn arb_primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_text().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Extra keys never collide with recognised payload keys.
fn arb_extra() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("x_[a-z]{1,8}", arb_primitive(), 0..5)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_graph() -> impl Strategy<Value = Graph> {
    let node = ("[a-z]{1,6}", arb_text(), arb_opt_text()).prop_map(|(id, label, viz_type)| {
        GraphNode {
            id,
            label,
            viz_type,
        }
    });
    let link = ("[a-z]{1,6}", "[a-z]{1,6}").prop_map(|(source, target)| GraphLink { source, target });
    (
        proptest::option::of("[a-z]{1,6}"),
        proptest::collection::vec(node, 0..6),
        proptest::collection::vec(link, 0..6),
    )
        .prop_map(|(center_id, nodes, links)| Graph {
            center_id,
            nodes,
            links,
        })
}

fn arb_command() -> impl Strategy<Value = Command> {
    (
        arb_action(),
        arb_opt_text(),
        proptest::option::of(arb_graph()),
        arb_extra(),
    )
        .prop_map(|(action, session_id, graph, extra)| Command {
            action,
            session_id,
            graph,
            extra,
        })
}

fn arb_structured() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({ "nested": true })),
        Just(json!([1, 2, 3])),
        Just(json!({ "list": ["a", { "b": 1 }] })),
        Just(Value::Null),
    ]
}

// --- Codec ---

proptest! {
    #[test]
    fn encode_decode_roundtrip(cmd in arb_command()) {
        let bytes = encode(&cmd).unwrap();
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, cmd);
    }

    #[test]
    fn structured_extras_are_dropped(
        cmd in arb_command(),
        key in "y_[a-z]{1,8}",
        value in arb_structured(),
    ) {
        let sent = cmd.clone().with_field(key.clone(), value);
        let decoded = decode(&encode(&sent).unwrap()).unwrap();
        prop_assert!(!decoded.extra.contains_key(&key));
        prop_assert_eq!(decoded, cmd);
    }

    #[test]
    fn outbound_payload_keeps_only_primitives(
        action in "[a-z_]{1,12}",
        primitives in arb_extra(),
        structured in proptest::collection::btree_map("y_[a-z]{1,8}", arb_structured(), 0..4),
    ) {
        let mut fields = primitives.clone();
        fields.extend(structured);
        let payload = outbound_payload(&action, fields);

        let expected_action = Value::from(action.as_str());
        prop_assert_eq!(payload.get("action"), Some(&expected_action));
        for (key, value) in &payload {
            if key != "action" {
                prop_assert_eq!(primitives.get(key), Some(value));
            }
        }
        prop_assert_eq!(payload.len(), primitives.len() + 1);
    }

    #[test]
    fn valid_commands_survive_reserved_keys(
        cmd in arb_command(),
        fields in proptest::collection::btree_map(
            prop_oneof![
                Just("action".to_string()),
                Just("label".to_string()),
                Just("message".to_string()),
                Just("sessionId".to_string()),
                Just("nodeId".to_string()),
                Just("vizType".to_string()),
                Just("description".to_string()),
                Just("question".to_string()),
                Just("graph".to_string()),
            ],
            arb_primitive(),
            0..4,
        ),
    ) {
        let mut cmd = cmd;
        cmd.extra.extend(fields);
        if cmd.validate().is_ok() {
            let decoded = decode(&encode(&cmd).unwrap()).unwrap();
            prop_assert_eq!(decoded, cmd);
        }
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }
}

// --- Channel ---

proptest! {
    #[test]
    fn garbage_leaves_last_command_untouched(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(decode(&bytes).is_err());

        let channel = CommandChannel::new(ChannelConfig::default());
        let seed = encode(&Command::new(Action::StartLesson)).unwrap();
        prop_assert!(channel.receive(&seed, None, DataPacketKind::Reliable, None));
        let before = channel.last_command();

        prop_assert!(!channel.receive(&bytes, Some("agent-1"), DataPacketKind::Reliable, None));
        prop_assert_eq!(channel.last_command(), before);
        prop_assert_eq!(channel.diagnostics().len(), 1);
    }

    #[test]
    fn payload_without_action_is_dropped(extra in arb_extra()) {
        let frame = serde_json::to_vec(&json!({ "kind": "command", "payload": extra })).unwrap();
        let channel = CommandChannel::new(ChannelConfig::default());
        prop_assert!(!channel.receive(&frame, None, DataPacketKind::Reliable, None));
        prop_assert!(channel.last_command().is_none());
        prop_assert_eq!(channel.diagnostics().len(), 1);
    }

    #[test]
    fn last_command_is_most_recent(cmds in proptest::collection::vec(arb_command(), 1..8)) {
        let channel = CommandChannel::new(ChannelConfig::default());
        for cmd in &cmds {
            prop_assert!(channel.receive(&encode(cmd).unwrap(), None, DataPacketKind::Reliable, None));
        }
        let last = channel.last_command();
        prop_assert_eq!(last.as_ref(), cmds.last());
    }
}
