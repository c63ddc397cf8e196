//! Command model: one variant per recognised action, plus a fallback that
//! keeps unknown actions flowing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CommandError;

/// Value of the frame's `kind` discriminator.
pub const COMMAND_KIND: &str = "command";

/// Action names with a dedicated [`Action`] variant.
pub const RECOGNISED_ACTIONS: [&str; 8] = [
    "navigate",
    "node_selected",
    "select_node_by_label",
    "back_to_graph",
    "start_lesson",
    "end_lesson",
    "error",
    "clarify",
];

/// What a command asks the other side to do.
///
/// Recognised payload keys are parsed into typed fields when they hold a
/// string. Everything else stays in [`Command::extra`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move the view to a node or screen.
    Navigate {
        node_id: Option<String>,
        label: Option<String>,
    },
    /// The user picked a node in the graph.
    NodeSelected {
        node_id: Option<String>,
        label: Option<String>,
        description: Option<String>,
        viz_type: Option<String>,
    },
    /// Agent asks the client to select the node carrying this label.
    SelectNodeByLabel { label: String },
    BackToGraph,
    StartLesson,
    EndLesson,
    /// Agent-side failure report. Ordinary data at this layer.
    Error { message: Option<String> },
    /// Agent wants the user to clarify. Stays on the agent, never published.
    Clarify { question: Option<String> },
    /// Any action this crate does not model. Must not reuse a recognised name.
    Other { action: String },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::NodeSelected { .. } => "node_selected",
            Self::SelectNodeByLabel { .. } => "select_node_by_label",
            Self::BackToGraph => "back_to_graph",
            Self::StartLesson => "start_lesson",
            Self::EndLesson => "end_lesson",
            Self::Error { .. } => "error",
            Self::Clarify { .. } => "clarify",
            Self::Other { action } => action,
        }
    }

    pub fn is_published(&self) -> bool {
        !matches!(self, Self::Clarify { .. })
    }

    /// For a payload key this action parses into a typed field, whether that
    /// field is set. `None` when the action has no field under `key`.
    fn typed_field(&self, key: &str) -> Option<bool> {
        match (self, key) {
            (Self::Navigate { node_id, .. }, "nodeId")
            | (Self::NodeSelected { node_id, .. }, "nodeId") => Some(node_id.is_some()),
            (Self::Navigate { label, .. }, "label") | (Self::NodeSelected { label, .. }, "label") => {
                Some(label.is_some())
            }
            (Self::NodeSelected { description, .. }, "description") => Some(description.is_some()),
            (Self::NodeSelected { viz_type, .. }, "vizType") => Some(viz_type.is_some()),
            (Self::SelectNodeByLabel { .. }, "label") => Some(true),
            (Self::Error { message }, "message") => Some(message.is_some()),
            (Self::Clarify { question }, "question") => Some(question.is_some()),
            _ => None,
        }
    }
}

/// Graph embedded in a command payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

impl Graph {
    fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Case-insensitive label lookup, the way spoken labels are matched.
    pub fn find_by_label(&self, label: &str) -> Option<&GraphNode> {
        let wanted = label.trim();
        self.nodes
            .iter()
            .find(|n| n.label.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn center(&self) -> Option<&GraphNode> {
        self.center_id.as_deref().and_then(|id| self.node(id))
    }
}

/// A decoded or outbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub action: Action,
    /// Correlates the command with a learning session.
    pub session_id: Option<String>,
    pub graph: Option<Graph>,
    /// Unrecognised payload keys. Only strings, numbers and booleans survive
    /// encoding.
    pub extra: Map<String, Value>,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            session_id: None,
            graph: None,
            extra: Map::new(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn action_name(&self) -> &str {
        self.action.name()
    }

    /// Build a command from a payload object (`{ "action": ..., ... }`).
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, CommandError> {
        let name = match payload.remove("action") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(CommandError::MissingAction),
        };

        let action = match name.as_str() {
            "navigate" => Action::Navigate {
                node_id: take_string(&mut payload, "nodeId"),
                label: take_string(&mut payload, "label"),
            },
            "node_selected" => Action::NodeSelected {
                node_id: take_string(&mut payload, "nodeId"),
                label: take_string(&mut payload, "label"),
                description: take_string(&mut payload, "description"),
                viz_type: take_string(&mut payload, "vizType"),
            },
            "select_node_by_label" => {
                let label = take_string(&mut payload, "label")
                    .filter(|label| !label.is_empty())
                    .ok_or(CommandError::MissingField {
                        action: "select_node_by_label",
                        field: "label",
                    })?;
                Action::SelectNodeByLabel { label }
            }
            "back_to_graph" => Action::BackToGraph,
            "start_lesson" => Action::StartLesson,
            "end_lesson" => Action::EndLesson,
            "error" => Action::Error {
                message: take_string(&mut payload, "message"),
            },
            "clarify" => Action::Clarify {
                question: take_string(&mut payload, "question"),
            },
            _ => Action::Other { action: name },
        };

        let session_id = take_string(&mut payload, "sessionId");
        let graph = match payload.remove("graph") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Graph>(value)
                    .map_err(|e| CommandError::InvalidGraph(e.to_string()))?,
            ),
        };

        Ok(Self {
            action,
            session_id,
            graph,
            extra: payload,
        })
    }

    /// Check that the command survives encoding unchanged: an `Other` action
    /// must not carry a recognised name, a select needs its label, and no
    /// extra field may be read back into a typed one.
    pub fn validate(&self) -> Result<(), CommandError> {
        match &self.action {
            Action::Other { action } if RECOGNISED_ACTIONS.contains(&action.as_str()) => {
                return Err(CommandError::ReservedAction {
                    action: action.clone(),
                });
            }
            Action::SelectNodeByLabel { label } if label.is_empty() => {
                return Err(CommandError::MissingField {
                    action: "select_node_by_label",
                    field: "label",
                });
            }
            _ => {}
        }
        match self
            .extra
            .iter()
            .find(|(key, value)| is_primitive(value) && self.shadows(key, value))
        {
            Some((key, _)) => Err(CommandError::ReservedField { field: key.clone() }),
            None => Ok(()),
        }
    }

    /// Whether decoding would move this extra value out of `extra`, or the
    /// typed field would overwrite it on encode.
    fn shadows(&self, key: &str, value: &Value) -> bool {
        match key {
            "action" | "graph" => true,
            "sessionId" => value.is_string() || self.session_id.is_some(),
            _ => self
                .action
                .typed_field(key)
                .is_some_and(|set| set || value.is_string()),
        }
    }

    /// Payload object for the wire. Non-primitive extra fields are dropped,
    /// and so are extras under keys a typed field owns.
    pub fn to_payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut payload: Map<String, Value> = self
            .extra
            .iter()
            .filter(|(key, value)| is_primitive(value) && !self.shadows(key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        payload.insert("action".into(), Value::from(self.action.name()));
        match &self.action {
            Action::Navigate { node_id, label } => {
                put_string(&mut payload, "nodeId", node_id);
                put_string(&mut payload, "label", label);
            }
            Action::NodeSelected {
                node_id,
                label,
                description,
                viz_type,
            } => {
                put_string(&mut payload, "nodeId", node_id);
                put_string(&mut payload, "label", label);
                put_string(&mut payload, "description", description);
                put_string(&mut payload, "vizType", viz_type);
            }
            Action::SelectNodeByLabel { label } => {
                payload.insert("label".into(), Value::from(label.as_str()));
            }
            Action::Error { message } => put_string(&mut payload, "message", message),
            Action::Clarify { question } => put_string(&mut payload, "question", question),
            Action::BackToGraph
            | Action::StartLesson
            | Action::EndLesson
            | Action::Other { .. } => {}
        }
        put_string(&mut payload, "sessionId", &self.session_id);
        if let Some(graph) = &self.graph {
            payload.insert("graph".into(), serde_json::to_value(graph)?);
        }
        Ok(payload)
    }
}

/// Strings, numbers and booleans. The only extra values that go on the wire.
pub fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn take_string(payload: &mut Map<String, Value>, key: &str) -> Option<String> {
    match payload.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            // Wrong type: leave it for `extra`
            payload.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn put_string(payload: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), Value::from(value.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn parses_recognised_actions() {
        let cmd = Command::from_payload(payload(json!({
            "action": "node_selected",
            "nodeId": "limits",
            "label": "Limits",
            "vizType": "manim",
            "sessionId": "learning-room",
        })))
        .unwrap();
        assert_eq!(
            cmd.action,
            Action::NodeSelected {
                node_id: Some("limits".into()),
                label: Some("Limits".into()),
                description: None,
                viz_type: Some("manim".into()),
            }
        );
        assert_eq!(cmd.session_id.as_deref(), Some("learning-room"));
        assert!(cmd.extra.is_empty());

        for (name, action) in [
            ("back_to_graph", Action::BackToGraph),
            ("start_lesson", Action::StartLesson),
            ("end_lesson", Action::EndLesson),
        ] {
            let cmd = Command::from_payload(payload(json!({ "action": name }))).unwrap();
            assert_eq!(cmd.action, action);
            assert_eq!(cmd.action_name(), name);
        }
    }

    #[test]
    fn unknown_action_keeps_fields() {
        let cmd = Command::from_payload(payload(json!({
            "action": "highlight",
            "color": "red",
            "weight": 3,
        })))
        .unwrap();
        assert_eq!(
            cmd.action,
            Action::Other {
                action: "highlight".into()
            }
        );
        assert_eq!(cmd.extra.get("color"), Some(&json!("red")));
        assert_eq!(cmd.extra.get("weight"), Some(&json!(3)));
    }

    #[test]
    fn select_by_label_requires_label() {
        let err = Command::from_payload(payload(json!({ "action": "select_node_by_label" })))
            .unwrap_err();
        assert!(matches!(err, CommandError::MissingField { field: "label", .. }));

        let err = Command::from_payload(payload(json!({
            "action": "select_node_by_label",
            "label": "",
        })))
        .unwrap_err();
        assert!(matches!(err, CommandError::MissingField { .. }));
    }

    #[test]
    fn missing_or_empty_action_rejected() {
        assert_eq!(
            Command::from_payload(payload(json!({ "label": "x" }))),
            Err(CommandError::MissingAction)
        );
        assert_eq!(
            Command::from_payload(payload(json!({ "action": "" }))),
            Err(CommandError::MissingAction)
        );
        assert_eq!(
            Command::from_payload(payload(json!({ "action": 7 }))),
            Err(CommandError::MissingAction)
        );
    }

    #[test]
    fn non_string_recognised_key_goes_to_extra() {
        let cmd = Command::from_payload(payload(json!({
            "action": "navigate",
            "nodeId": 12,
        })))
        .unwrap();
        assert_eq!(
            cmd.action,
            Action::Navigate {
                node_id: None,
                label: None
            }
        );
        assert_eq!(cmd.extra.get("nodeId"), Some(&json!(12)));
    }

    #[test]
    fn malformed_graph_rejected() {
        let err = Command::from_payload(payload(json!({
            "action": "show_graph",
            "graph": { "nodes": "not a list" },
        })))
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidGraph(_)));
    }

    #[test]
    fn payload_drops_structured_extras() {
        let cmd = Command::new(Action::Error {
            message: Some("boom".into()),
        })
        .with_field("attempt", 2)
        .with_field("fatal", false)
        .with_field("details", json!({ "trace": [1, 2] }))
        .with_field("tags", json!(["a"]))
        .with_field("nothing", Value::Null);

        let payload = cmd.to_payload().unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({
                "action": "error",
                "message": "boom",
                "attempt": 2,
                "fatal": false,
            })
        );
    }

    #[test]
    fn validate_rejects_recognised_name_as_other() {
        for name in ["clarify", "navigate"] {
            let cmd = Command::new(Action::Other {
                action: name.into(),
            });
            assert_eq!(
                cmd.validate(),
                Err(CommandError::ReservedAction {
                    action: name.into()
                })
            );
        }
        assert!(
            Command::new(Action::Other {
                action: "show_graph".into()
            })
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn validate_rejects_extras_under_typed_keys() {
        let reserved = |cmd: Command| match cmd.validate() {
            Err(CommandError::ReservedField { field }) => field,
            other => panic!("expected reserved field, got {other:?}"),
        };
        assert_eq!(
            reserved(Command::new(Action::StartLesson).with_field("graph", "none")),
            "graph"
        );
        assert_eq!(
            reserved(Command::new(Action::StartLesson).with_field("sessionId", "s1")),
            "sessionId"
        );
        assert_eq!(
            reserved(
                Command::new(Action::Navigate {
                    node_id: None,
                    label: None
                })
                .with_field("nodeId", "limits")
            ),
            "nodeId"
        );
        assert_eq!(
            reserved(
                Command::new(Action::Navigate {
                    node_id: Some("limits".into()),
                    label: None
                })
                .with_field("nodeId", 12)
            ),
            "nodeId"
        );
        assert!(
            Command::new(Action::SelectNodeByLabel {
                label: String::new()
            })
            .validate()
            .is_err()
        );
    }

    #[test]
    fn validate_allows_what_decoding_keeps_in_extra() {
        // Shapes that from_payload itself leaves in `extra`
        let cmd = Command::new(Action::Navigate {
            node_id: None,
            label: None,
        })
        .with_field("nodeId", 12)
        .with_field("message", "not typed on navigate")
        .with_field("sessionId", 7);
        assert!(cmd.validate().is_ok());

        let decoded = Command::from_payload(cmd.to_payload().unwrap()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn payload_skips_shadowed_extras() {
        let cmd = Command::new(Action::StartLesson)
            .with_field("graph", "none")
            .with_field("sessionId", "s1")
            .with_field("action", "clarify");
        assert_eq!(
            Value::Object(cmd.to_payload().unwrap()),
            json!({ "action": "start_lesson" })
        );
    }

    #[test]
    fn graph_uses_camel_case() {
        let graph = Graph {
            center_id: Some("derivatives".into()),
            nodes: vec![GraphNode {
                id: "derivatives".into(),
                label: "Derivatives".into(),
                viz_type: Some("three".into()),
            }],
            links: vec![GraphLink {
                source: "limits".into(),
                target: "derivatives".into(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&graph).unwrap(),
            json!({
                "centerId": "derivatives",
                "nodes": [{ "id": "derivatives", "label": "Derivatives", "vizType": "three" }],
                "links": [{ "source": "limits", "target": "derivatives" }],
            })
        );
        assert_eq!(graph.center().map(|n| n.label.as_str()), Some("Derivatives"));
    }

    #[test]
    fn find_by_label_ignores_case() {
        let graph = Graph {
            center_id: None,
            nodes: vec![
                GraphNode {
                    id: "limits".into(),
                    label: "Limits".into(),
                    viz_type: None,
                },
                GraphNode {
                    id: "chain-rule".into(),
                    label: "Chain Rule".into(),
                    viz_type: None,
                },
            ],
            links: Vec::new(),
        };
        assert_eq!(
            graph.find_by_label(" chain rule ").map(|n| n.id.as_str()),
            Some("chain-rule")
        );
        assert!(graph.find_by_label("Integrals").is_none());
    }

    #[test]
    fn clarify_is_not_published() {
        assert!(!Action::Clarify { question: None }.is_published());
        assert!(Action::BackToGraph.is_published());
    }
}
