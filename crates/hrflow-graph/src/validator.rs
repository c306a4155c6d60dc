//! Structural checks run before a workflow may be simulated.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use hrflow_core::types::{Edge, Node, NodeData, NodeKind, Workflow};

/// Outcome of validation. Errors block simulation; warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// True when nothing blocks simulation.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when there are neither errors nor warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Check a graph snapshot. Every rule runs; nothing short-circuits.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    let mut report = ValidationReport::default();

    let starts = nodes.iter().filter(|n| n.kind() == NodeKind::Start).count();
    if starts == 0 {
        report.errors.push("Workflow must have a Start node".to_string());
    } else if starts > 1 {
        report.warnings.push(format!(
            "Multiple start nodes detected ({}); simulation begins at the first one",
            starts
        ));
    }

    if !nodes.iter().any(|n| n.kind() == NodeKind::End) {
        report.errors.push("Workflow must have an End node".to_string());
    }

    let mut incoming: HashMap<&str, usize> = HashMap::new();
    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    for edge in edges {
        *outgoing.entry(edge.source.as_str()).or_default() += 1;
        *incoming.entry(edge.target.as_str()).or_default() += 1;
    }

    for node in nodes.iter().filter(|n| n.kind() != NodeKind::Start) {
        if !incoming.contains_key(node.id.as_str()) {
            report.warnings.push(format!(
                "Node \"{}\" has no incoming connections",
                node.label()
            ));
        }
    }

    for node in nodes.iter().filter(|n| n.kind() != NodeKind::End) {
        if !outgoing.contains_key(node.id.as_str()) {
            report.warnings.push(format!(
                "Node \"{}\" has no outgoing connections",
                node.label()
            ));
        }
    }

    if let Some(at) = find_cycle(nodes, edges) {
        let label = nodes
            .iter()
            .find(|n| n.id == at)
            .map(|n| n.label())
            .unwrap_or(at);
        report.warnings.push(format!(
            "Possible cycle detected in workflow (at \"{}\")",
            label
        ));
    }

    for node in nodes {
        match &node.data {
            NodeData::Task(d) if d.title.trim().is_empty() => {
                report
                    .warnings
                    .push(format!("Task node \"{}\" has no title", node.id));
            }
            NodeData::Approval(d) if d.approver_role.trim().is_empty() => {
                report.warnings.push(format!(
                    "Approval node \"{}\" has no approver role specified",
                    node.id
                ));
            }
            _ => {}
        }
    }

    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                report.errors.push(format!(
                    "Edge \"{}\" references missing node \"{}\"",
                    edge.id, endpoint
                ));
            }
        }
    }

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Workflow validated"
    );
    report
}

/// Validate a whole document.
pub fn validate_workflow(workflow: &Workflow) -> ValidationReport {
    validate(&workflow.nodes, &workflow.edges)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Iterative depth-first search from every unvisited node. Returns the node
/// a back-edge points at, if any.
fn find_cycle<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> Option<&'a str> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let roots = nodes
        .iter()
        .map(|n| n.id.as_str())
        .chain(edges.iter().map(|e| e.source.as_str()));

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for root in roots {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::InProgress);
        // (node, index of the next child to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let children = adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]);
            match children.get(frame.1) {
                Some(&child) => {
                    frame.1 += 1;
                    match marks.get(child).copied() {
                        Some(Mark::InProgress) => return Some(child),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::InProgress);
                            stack.push((child, 0));
                        }
                    }
                }
                None => {
                    marks.insert(current, Mark::Done);
                    stack.pop();
                }
            }
        }
    }
    None
}
