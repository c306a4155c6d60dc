use rand::Rng;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use hrflow_core::error::{HrflowError, Result};
use hrflow_core::types::{
    default_workflow_name, new_workflow_id, Edge, Node, NodeData, NodeKind, Position, Workflow,
};

use crate::document;

/// A node kind plus an optional display label, as dropped from a palette.
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub kind: NodeKind,
    pub label: Option<String>,
}

impl NodeTemplate {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<NodeKind> for NodeTemplate {
    fn from(kind: NodeKind) -> Self {
        Self::new(kind)
    }
}

/// A canvas-originated change to the node set.
#[derive(Debug, Clone)]
pub enum NodeChange {
    Position { id: String, position: Position },
    Remove { id: String },
    Select { id: String, selected: bool },
}

/// A canvas-originated change to the edge set.
#[derive(Debug, Clone)]
pub enum EdgeChange {
    Remove { id: String },
}

/// Owner of a workflow's nodes, edges and selection.
///
/// All mutation goes through this type; validation and simulation work on
/// snapshots taken with [`GraphStore::to_document`] or the slice accessors.
/// Node and edge order is insertion order.
#[derive(Debug, Clone)]
pub struct GraphStore {
    workflow_id: String,
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selected: Option<String>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(default_workflow_name())
    }
}

impl GraphStore {
    /// Create an empty workflow with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            workflow_id: new_workflow_id(),
            name: name.into(),
            nodes: vec![],
            edges: vec![],
            selected: None,
        }
    }

    /// Load a previously exported document. Nothing is kept if it is invalid.
    pub fn from_document(doc: &Workflow) -> Result<Self> {
        let (nodes, edges) = document::from_document(doc)?;
        Ok(Self {
            workflow_id: doc.id.clone(),
            name: doc.name.clone(),
            nodes,
            edges,
            selected: None,
        })
    }

    pub fn to_document(&self) -> Workflow {
        document::to_document(&self.workflow_id, &self.name, &self.nodes, &self.edges)
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Add a node of `kind` with default attributes and select it.
    ///
    /// Without a position the node is dropped somewhere in the
    /// `[100, 400)` square. Completing the first start/end pair wires
    /// `start -> end` automatically.
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> Node {
        self.add_from_template(&NodeTemplate::new(kind), position)
    }

    /// Add a node from a palette template, using its label as the title.
    pub fn add_from_template(
        &mut self,
        template: &NodeTemplate,
        position: Option<Position>,
    ) -> Node {
        let position = position.unwrap_or_else(random_position);
        let mut node = Node::new(template.kind, position);
        if let Some(label) = template.label.as_deref().filter(|l| !l.is_empty()) {
            node.data.set_title(label);
        }

        info!(node_id = %node.id, kind = %node.kind(), "Node added");
        self.nodes.push(node.clone());
        self.selected = Some(node.id.clone());

        if matches!(template.kind, NodeKind::Start | NodeKind::End) {
            self.auto_wire();
        }
        node
    }

    /// Connect the sole start node to the sole end node if they are not
    /// connected yet.
    fn auto_wire(&mut self) {
        let (Some(start), Some(end)) = (
            self.sole_node_of(NodeKind::Start),
            self.sole_node_of(NodeKind::End),
        ) else {
            return;
        };
        if self
            .edges
            .iter()
            .any(|e| e.source == start && e.target == end)
        {
            return;
        }
        debug!(source = %start, target = %end, "Auto-wiring start to end");
        let edge = Edge::with_id(format!("edge_{}_{}", start, end), start, end);
        self.edges.push(edge);
    }

    fn sole_node_of(&self, kind: NodeKind) -> Option<String> {
        let mut matching = self.nodes.iter().filter(|n| n.kind() == kind);
        match (matching.next(), matching.next()) {
            (Some(node), None) => Some(node.id.clone()),
            _ => None,
        }
    }

    /// Merge `patch` into a node's attributes.
    ///
    /// Returns `Ok(false)` if no node has that id. Unknown fields are kept;
    /// a patch that gives a known field the wrong shape is rejected and the
    /// node is left untouched.
    pub fn update_node(&mut self, id: &str, patch: &Map<String, Value>) -> Result<bool> {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            debug!(node_id = %id, "Update for unknown node ignored");
            return Ok(false);
        };

        let mut value = node.data.to_value()?;
        if let Value::Object(fields) = &mut value {
            for (key, v) in patch {
                fields.insert(key.clone(), v.clone());
            }
        }

        node.data = NodeData::from_value(node.kind(), value).map_err(|e| {
            HrflowError::InvalidAttributes {
                node: id.to_string(),
                message: e.to_string(),
            }
        })?;
        debug!(node_id = %id, fields = patch.len(), "Node updated");
        Ok(true)
    }

    /// Remove a node and every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }

        let edges_before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        info!(
            node_id = %id,
            edges_removed = edges_before - self.edges.len(),
            "Node deleted"
        );
        true
    }

    /// Draw an edge. Parallel edges are allowed, and endpoints are not
    /// checked here; dangling references show up in validation.
    pub fn connect(&mut self, source: &str, target: &str) -> Edge {
        if self.node(source).is_none() || self.node(target).is_none() {
            warn!(source = %source, target = %target, "Connecting to a node that does not exist");
        }
        let edge = Edge::new(source, target);
        debug!(edge_id = %edge.id, source = %source, target = %target, "Edge added");
        self.edges.push(edge.clone());
        edge
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        self.edges.len() != before
    }

    /// Apply position, removal and selection changes coming from the canvas.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.position = position;
                    }
                }
                NodeChange::Remove { id } => {
                    self.delete_node(&id);
                }
                NodeChange::Select { id, selected } => {
                    if selected {
                        self.select(&id);
                    } else if self.selected.as_deref() == Some(id.as_str()) {
                        self.selected = None;
                    }
                }
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Remove { id } => {
                    self.remove_edge(&id);
                }
            }
        }
    }

    /// Empty the workflow if `confirm` agrees. Returns whether it did.
    pub fn clear<F>(&mut self, confirm: F) -> bool
    where
        F: FnOnce(&GraphStore) -> bool,
    {
        if !confirm(self) {
            debug!("Clear declined");
            return false;
        }
        info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Workflow cleared"
        );
        self.nodes.clear();
        self.edges.clear();
        self.selected = None;
        true
    }

    /// Select a node. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn current_selection(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.node(id))
    }
}

fn random_position() -> Position {
    let mut rng = rand::thread_rng();
    Position::new(rng.gen_range(100.0..400.0), rng.gen_range(100.0..400.0))
}
