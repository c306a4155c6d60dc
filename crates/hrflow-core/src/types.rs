use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Presentation style given to edges drawn by the author.
pub const DEFAULT_EDGE_STYLE: &str = "smoothstep";

/// The closed set of step kinds a workflow can contain.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Task,
    Approval,
    Automated,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Start,
        NodeKind::Task,
        NodeKind::Approval,
        NodeKind::Automated,
        NodeKind::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Task => "task",
            NodeKind::Approval => "approval",
            NodeKind::Automated => "automated",
            NodeKind::End => "end",
        }
    }

    /// Title given to a freshly added node of this kind.
    pub fn default_title(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start Process",
            NodeKind::Task => "New Task",
            NodeKind::Approval => "Approval Required",
            NodeKind::Automated => "Automated Action",
            NodeKind::End => "End Process",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown node kind '{}' (expected start, task, approval, automated or end)",
                    s
                )
            })
    }
}

/// Canvas coordinate. Carries no graph semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ── Attribute records ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Manual,
    Scheduled,
    Event,
    Api,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    Single,
    Multiple,
    Any,
}

// Form inputs store what was typed, so numeric fields may arrive as strings
// ("48") or as "" once cleared.

fn form_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid estimatedHours '{}'", s))),
        other => Err(D::Error::custom(format!(
            "invalid estimatedHours {}, expected a number",
            other
        ))),
    }
}

fn form_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let invalid = |shown: &dyn fmt::Display| {
        D::Error::custom(format!(
            "invalid autoApproveThreshold {}, expected whole hours",
            shown
        ))
    };
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .and_then(|h| u32::try_from(h).ok())
            .ok_or_else(|| invalid(&n)),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s.trim().parse().map_err(|_| invalid(&s)),
        other => Err(invalid(&other)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Fields this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "form_hours"
    )]
    pub estimated_hours: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub approver_role: String,
    /// Hours until the request approves itself; 0 disables it.
    #[serde(default, deserialize_with = "form_threshold")]
    pub auto_approve_threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_comment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_type: Option<ApprovalType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Id into the action catalog.
    #[serde(default)]
    pub action: String,
    /// Parameter values keyed by the catalog entry's parameter names.
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndData {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_data: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind-specific attributes of a node. The variant is the node's kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    Start(StartData),
    Task(TaskData),
    Approval(ApprovalData),
    Automated(AutomatedData),
    End(EndData),
}

impl NodeData {
    /// Attributes a new node of `kind` starts with.
    pub fn defaults(kind: NodeKind) -> Self {
        let title = kind.default_title().to_string();
        let description = Some(String::new());
        match kind {
            NodeKind::Start => NodeData::Start(StartData {
                title,
                description,
                ..Default::default()
            }),
            NodeKind::Task => NodeData::Task(TaskData {
                title,
                description,
                ..Default::default()
            }),
            NodeKind::Approval => NodeData::Approval(ApprovalData {
                title,
                description,
                approver_role: "manager".to_string(),
                auto_approve_threshold: 24,
                ..Default::default()
            }),
            NodeKind::Automated => NodeData::Automated(AutomatedData {
                title,
                description,
                action: "send_email".to_string(),
                ..Default::default()
            }),
            NodeKind::End => NodeData::End(EndData {
                title,
                description,
                message: "Workflow completed".to_string(),
                summary: Some(true),
                ..Default::default()
            }),
        }
    }

    /// Decode an attribute record for a node of the given kind.
    pub fn from_value(kind: NodeKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::Start => NodeData::Start(serde_json::from_value(value)?),
            NodeKind::Task => NodeData::Task(serde_json::from_value(value)?),
            NodeKind::Approval => NodeData::Approval(serde_json::from_value(value)?),
            NodeKind::Automated => NodeData::Automated(serde_json::from_value(value)?),
            NodeKind::End => NodeData::End(serde_json::from_value(value)?),
        })
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Start(_) => NodeKind::Start,
            NodeData::Task(_) => NodeKind::Task,
            NodeData::Approval(_) => NodeKind::Approval,
            NodeData::Automated(_) => NodeKind::Automated,
            NodeData::End(_) => NodeKind::End,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            NodeData::Start(d) => &d.title,
            NodeData::Task(d) => &d.title,
            NodeData::Approval(d) => &d.title,
            NodeData::Automated(d) => &d.title,
            NodeData::End(d) => &d.title,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        match self {
            NodeData::Start(d) => d.title = title,
            NodeData::Task(d) => d.title = title,
            NodeData::Approval(d) => d.title = title,
            NodeData::Automated(d) => d.title = title,
            NodeData::End(d) => d.title = title,
        }
    }
}

// ── Graph elements ─────────────────────────────────────────────

/// A step in the workflow graph.
///
/// On the wire a node is `{id, type, position, data}`; `type` is derived
/// from the attribute variant, so kind and attributes can never disagree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Option<Value>,
}

impl TryFrom<RawNode> for Node {
    type Error = serde_json::Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let value = raw.data.unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Node {
            id: raw.id,
            position: raw.position,
            data: NodeData::from_value(raw.kind, value)?,
        })
    }
}

impl Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct NodeRef<'a> {
            id: &'a str,
            #[serde(rename = "type")]
            kind: NodeKind,
            position: &'a Position,
            data: &'a NodeData,
        }

        NodeRef {
            id: &self.id,
            kind: self.kind(),
            position: &self.position,
            data: &self.data,
        }
        .serialize(serializer)
    }
}

impl Node {
    /// Create a node of `kind` with a fresh id and default attributes.
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self::with_id(new_node_id(kind), kind, position)
    }

    pub fn with_id(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            data: NodeData::defaults(kind),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn title(&self) -> &str {
        self.data.title()
    }

    /// Title, or `fallback` when the title is blank.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let title = self.title();
        if title.trim().is_empty() {
            fallback
        } else {
            title
        }
    }

    /// Human-readable label for messages: the title, else the id.
    pub fn label(&self) -> &str {
        self.title_or(&self.id)
    }
}

/// A directed, unconditioned connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Presentation style only.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Edge {
    /// Create an edge with a fresh id and the default style.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_id(new_edge_id(), source, target)
    }

    pub fn with_id(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: Some(DEFAULT_EDGE_STYLE.to_string()),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

// ── Workflow document ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub version: String,
    pub node_count: usize,
    pub edge_count: usize,
}

/// The portable unit exchanged at the export/import boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    #[serde(default = "default_workflow_name")]
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

pub fn default_workflow_name() -> String {
    "HR Workflow".to_string()
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First start node in document order.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind() == NodeKind::Start)
    }
}

pub fn new_node_id(kind: NodeKind) -> String {
    format!("{}_{}", kind, Uuid::new_v4())
}

pub fn new_edge_id() -> String {
    format!("edge_{}", Uuid::new_v4())
}

pub fn new_workflow_id() -> String {
    format!("workflow_{}", Uuid::new_v4())
}

// ── Simulation results ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
    Warning,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// One entry of the simulation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStep {
    pub step: usize,
    pub node_id: String,
    /// `None` when the step refers to a node that does not exist.
    pub node_type: Option<NodeKind>,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub total_steps: usize,
    pub completed_at: DateTime<Utc>,
    pub success_rate: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    pub steps: Vec<SimulationStep>,
    pub summary: SimulationSummary,
}

/// Events published while a simulation run is in progress.
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    Started {
        workflow_id: String,
        workflow_name: String,
    },
    Step(SimulationStep),
    Finished(SimulationSummary),
    Failed {
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("Approval".parse::<NodeKind>().unwrap(), NodeKind::Approval);
        assert_eq!(NodeKind::Automated.to_string(), "automated");
        assert!("gateway".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_defaults_per_kind() {
        match NodeData::defaults(NodeKind::Approval) {
            NodeData::Approval(d) => {
                assert_eq!(d.title, "Approval Required");
                assert_eq!(d.approver_role, "manager");
                assert_eq!(d.auto_approve_threshold, 24);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        match NodeData::defaults(NodeKind::End) {
            NodeData::End(d) => {
                assert_eq!(d.message, "Workflow completed");
                assert_eq!(d.summary, Some(true));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_node_wire_shape() {
        let node = Node::with_id("task_1", NodeKind::Task, Position::new(10.0, 20.0));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "task_1");
        assert_eq!(value["type"], "task");
        assert_eq!(value["position"], json!({"x": 10.0, "y": 20.0}));
        assert_eq!(value["data"]["title"], "New Task");
        assert_eq!(value["data"]["priority"], "medium");
        assert_eq!(value["data"]["dueDate"], "");
        assert!(value["data"].get("estimatedHours").is_none());
    }

    #[test]
    fn test_unknown_fields_survive() {
        let value = json!({
            "id": "approval_1",
            "type": "approval",
            "position": {"x": 0, "y": 0},
            "data": {
                "title": "HR sign-off",
                "approverRole": "hr",
                "autoApproveThreshold": 0,
                "escalateTo": "director"
            }
        });
        let node: Node = serde_json::from_value(value).unwrap();
        match &node.data {
            NodeData::Approval(d) => {
                assert_eq!(d.approver_role, "hr");
                assert_eq!(d.extra.get("escalateTo"), Some(&json!("director")));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["data"]["escalateTo"], "director");
    }

    #[test]
    fn test_form_edited_numbers_accepted() {
        let value = json!({"title": "Laptop", "estimatedHours": "", "priority": "low"});
        match NodeData::from_value(NodeKind::Task, value).unwrap() {
            NodeData::Task(d) => assert_eq!(d.estimated_hours, None),
            other => panic!("unexpected variant: {:?}", other),
        }

        let value = json!({"estimatedHours": " 2.5 "});
        match NodeData::from_value(NodeKind::Task, value).unwrap() {
            NodeData::Task(d) => assert_eq!(d.estimated_hours, Some(2.5)),
            other => panic!("unexpected variant: {:?}", other),
        }

        for (raw, hours) in [(json!("48"), 48), (json!(""), 0), (json!(12), 12), (json!(null), 0)] {
            let value = json!({"approverRole": "hr", "autoApproveThreshold": raw});
            match NodeData::from_value(NodeKind::Approval, value).unwrap() {
                NodeData::Approval(d) => assert_eq!(d.auto_approve_threshold, hours),
                other => panic!("unexpected variant: {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_numeric_form_values_rejected() {
        let value = json!({"autoApproveThreshold": "soon"});
        assert!(NodeData::from_value(NodeKind::Approval, value).is_err());
        let value = json!({"autoApproveThreshold": -3});
        assert!(NodeData::from_value(NodeKind::Approval, value).is_err());
        let value = json!({"estimatedHours": "a while"});
        assert!(NodeData::from_value(NodeKind::Task, value).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let value = json!({"id": "x", "type": "gateway", "position": {"x": 0, "y": 0}, "data": {}});
        assert!(serde_json::from_value::<Node>(value).is_err());
    }

    #[test]
    fn test_title_fallback() {
        let mut node = Node::with_id("task_1", NodeKind::Task, Position::default());
        node.data.set_title("  ");
        assert_eq!(node.label(), "task_1");
        assert_eq!(node.title_or("HR Workflow"), "HR Workflow");
    }

    #[test]
    fn test_edge_defaults() {
        let edge = Edge::new("a", "b");
        assert!(edge.id.starts_with("edge_"));
        assert_eq!(edge.kind.as_deref(), Some("smoothstep"));
        assert!(edge.touches("a"));
        assert!(edge.touches("b"));
        assert!(!edge.touches("c"));
    }
}
