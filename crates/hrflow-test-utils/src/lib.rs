//! Shared fixtures for hrflow tests.
//!
//! Fixture nodes use readable ids (`"S"`, `"T"`, `"E"`) and edges are named
//! `"<source>-><target>"` so assertions stay short.

use std::io::Write;

use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};

use hrflow_core::types::{
    AutomatedData, Edge, Node, NodeData, NodeKind, Position, Workflow,
};

/// A node with default attributes and a readable id.
pub fn node(kind: NodeKind, id: &str) -> Node {
    Node::with_id(id, kind, Position::default())
}

pub fn start(id: &str) -> Node {
    node(NodeKind::Start, id)
}

pub fn end(id: &str) -> Node {
    node(NodeKind::End, id)
}

/// A task node with the given assignee (empty string for unassigned).
pub fn task(id: &str, assignee: &str) -> Node {
    let mut n = node(NodeKind::Task, id);
    if let NodeData::Task(data) = &mut n.data {
        data.assignee = assignee.to_string();
    }
    n
}

pub fn approval(id: &str, role: &str, threshold_hours: u32) -> Node {
    let mut n = node(NodeKind::Approval, id);
    if let NodeData::Approval(data) = &mut n.data {
        data.approver_role = role.to_string();
        data.auto_approve_threshold = threshold_hours;
    }
    n
}

/// An automated node calling `action` with string parameters.
pub fn automated(id: &str, action: &str, params: &[(&str, &str)]) -> Node {
    let mut n = node(NodeKind::Automated, id);
    n.data = NodeData::Automated(AutomatedData {
        title: NodeKind::Automated.default_title().to_string(),
        description: Some(String::new()),
        action: action.to_string(),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<Map<String, Value>>(),
        extra: Map::new(),
    });
    n
}

pub fn edge(source: &str, target: &str) -> Edge {
    Edge::with_id(format!("{}->{}", source, target), source, target)
}

/// Wrap nodes and edges in a document with a fixed timestamp.
pub fn workflow(nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
    Workflow {
        id: "workflow_test".to_string(),
        name: "Test Workflow".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        nodes,
        edges,
        metadata: None,
    }
}

/// `S -> T(assignee) -> E`.
pub fn linear_workflow(assignee: &str) -> Workflow {
    workflow(
        vec![start("S"), task("T", assignee), end("E")],
        vec![edge("S", "T"), edge("T", "E")],
    )
}

/// A typical onboarding process touching every node kind.
pub fn onboarding_workflow() -> Workflow {
    workflow(
        vec![
            start("S"),
            task("collect_docs", "Alice"),
            approval("manager_ok", "manager", 48),
            automated(
                "welcome_mail",
                "send_email",
                &[("to", "new.hire@example.com"), ("subject", "Welcome aboard")],
            ),
            end("E"),
        ],
        vec![
            edge("S", "collect_docs"),
            edge("collect_docs", "manager_ok"),
            edge("manager_ok", "welcome_mail"),
            edge("welcome_mail", "E"),
        ],
    )
}

/// Write a workflow document to a temp file, pretty-printed.
pub fn temp_document(workflow: &Workflow) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    let json = serde_json::to_string_pretty(workflow).expect("serialize workflow");
    file.write_all(json.as_bytes()).expect("write workflow");
    file
}
