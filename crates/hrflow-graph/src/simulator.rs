//! Dry-run of a workflow along a single deterministic path.
//!
//! The walk starts at the first start node and, at every step, follows the
//! node's first outgoing edge in insertion order. It stops at an end node, at
//! a node with no outgoing edge, at an edge whose target does not exist
//! (`failed` step), or when it would revisit a node (`warning` step). Only a
//! missing start node is an error; everything else is recorded on the steps.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hrflow_core::catalog::{ActionCatalog, ActionSpec};
use hrflow_core::config::SimulatorConfig;
use hrflow_core::error::{HrflowError, Result};
use hrflow_core::event::EventBus;
use hrflow_core::types::{
    AutomatedData, Edge, Node, NodeData, NodeKind, SimulationEvent, SimulationResult, SimulationStep,
    SimulationSummary, StepStatus, Workflow,
};

/// Lazily produced sequence of simulation steps.
pub struct Walk<'a> {
    catalog: &'a ActionCatalog,
    nodes: HashMap<&'a str, &'a Node>,
    /// First outgoing edge of each node, by insertion order.
    first_edge: HashMap<&'a str, &'a Edge>,
    current: Option<&'a Node>,
    visited: HashSet<&'a str>,
    started: bool,
    next_step: usize,
}

impl<'a> Walk<'a> {
    pub fn new(workflow: &'a Workflow, catalog: &'a ActionCatalog) -> Result<Self> {
        let start = workflow.start_node().ok_or(HrflowError::NoStartNode)?;

        let mut nodes = HashMap::new();
        for node in &workflow.nodes {
            nodes.entry(node.id.as_str()).or_insert(node);
        }
        let mut first_edge = HashMap::new();
        for edge in &workflow.edges {
            first_edge.entry(edge.source.as_str()).or_insert(edge);
        }

        Ok(Self {
            catalog,
            nodes,
            first_edge,
            current: Some(start),
            visited: HashSet::from([start.id.as_str()]),
            started: false,
            next_step: 1,
        })
    }

    fn emit(
        &mut self,
        node_id: &str,
        node: Option<&Node>,
        action: String,
        status: StepStatus,
    ) -> SimulationStep {
        let step = SimulationStep {
            step: self.next_step,
            node_id: node_id.to_string(),
            node_type: node.map(Node::kind),
            action,
            timestamp: Utc::now(),
            status,
        };
        self.next_step += 1;
        step
    }

    fn finish(&mut self) -> Option<SimulationStep> {
        self.current = None;
        None
    }
}

impl Iterator for Walk<'_> {
    type Item = SimulationStep;

    fn next(&mut self) -> Option<SimulationStep> {
        let current = self.current?;

        if !self.started {
            self.started = true;
            let action = format!("Starting workflow: {}", current.title_or("HR Workflow"));
            return Some(self.emit(&current.id, Some(current), action, StepStatus::Completed));
        }

        if current.kind() == NodeKind::End {
            return self.finish();
        }

        let Some(edge) = self.first_edge.get(current.id.as_str()).copied() else {
            debug!(node_id = %current.id, "No outgoing edge, walk ends here");
            return self.finish();
        };

        let Some(target) = self.nodes.get(edge.target.as_str()).copied() else {
            warn!(edge_id = %edge.id, target = %edge.target, "Edge target not found");
            self.current = None;
            let action = format!(
                "Error: target node \"{}\" not found for edge from {}",
                edge.target, current.id
            );
            return Some(self.emit(&edge.target, None, action, StepStatus::Failed));
        };

        if !self.visited.insert(target.id.as_str()) {
            warn!(node_id = %target.id, "Walk revisited a node, stopping");
            self.current = None;
            let action = format!(
                "Circular reference detected at {}",
                target.title_or(target.kind().as_str())
            );
            return Some(self.emit(&target.id, Some(target), action, StepStatus::Warning));
        }

        self.current = Some(target);
        let action = describe(target, self.catalog);
        Some(self.emit(&target.id, Some(target), action, StepStatus::Completed))
    }
}

/// Log line for arriving at `node`.
fn describe(node: &Node, catalog: &ActionCatalog) -> String {
    match &node.data {
        NodeData::Task(d) => {
            let assignee = if d.assignee.trim().is_empty() {
                "Unassigned"
            } else {
                d.assignee.as_str()
            };
            format!("Task assigned to {}: {}", assignee, d.title)
        }
        NodeData::Approval(d) => {
            let role = if d.approver_role.trim().is_empty() {
                "Manager"
            } else {
                d.approver_role.as_str()
            };
            let mut action = format!("Waiting for {} approval: {}", role, d.title);
            if d.auto_approve_threshold > 0 {
                action.push_str(&format!(" (auto-approve in {}h)", d.auto_approve_threshold));
            }
            action
        }
        NodeData::Automated(d) => {
            let spec = catalog.get(&d.action);
            let label = spec.map(|s| s.label.as_str()).unwrap_or("Unknown action");
            let mut action = format!("Executing automated action: {}", label);
            let params = format_params(d, spec);
            if !params.is_empty() {
                action.push_str(" with params: ");
                action.push_str(&params);
            }
            action
        }
        NodeData::End(d) => {
            let message = if d.message.trim().is_empty() {
                "Success"
            } else {
                d.message.as_str()
            };
            format!("Workflow completed: {}", message)
        }
        NodeData::Start(_) => format!("Processing {} node: {}", node.kind(), node.label()),
    }
}

/// `k=v` pairs for every non-empty parameter: declared parameters first in
/// catalog order, then any others in key order.
fn format_params(data: &AutomatedData, spec: Option<&ActionSpec>) -> String {
    let declared: Vec<&str> = spec
        .map(|s| s.params.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let undeclared = data
        .params
        .keys()
        .map(String::as_str)
        .filter(|k| !declared.contains(k));

    declared
        .iter()
        .copied()
        .chain(undeclared)
        .filter_map(|name| {
            let value = data.params.get(name)?;
            render_param(value).map(|v| format!("{}={}", name, v))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Runs simulations against an action catalog.
///
/// [`Simulator::simulate`] produces the log in one go; [`Simulator::run`]
/// paces it with the configured delays, publishes each step on the event
/// bus, and can be cancelled between steps.
#[derive(Clone)]
pub struct Simulator {
    catalog: Arc<ActionCatalog>,
    start_delay: Duration,
    step_delay: Duration,
    events: Option<Arc<EventBus>>,
}

impl Simulator {
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self::from_config(catalog, &SimulatorConfig::default())
    }

    pub fn from_config(catalog: Arc<ActionCatalog>, config: &SimulatorConfig) -> Self {
        Self {
            catalog,
            start_delay: config.start_delay(),
            step_delay: config.step_delay(),
            events: None,
        }
    }

    pub fn with_delays(mut self, start_delay: Duration, step_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self.step_delay = step_delay;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Walk the workflow without pacing.
    pub fn simulate(&self, workflow: &Workflow) -> Result<SimulationResult> {
        let steps: Vec<SimulationStep> = Walk::new(workflow, &self.catalog)?.collect();
        Ok(self.summarize(steps))
    }

    /// Walk the workflow with pacing, publishing progress as it goes.
    pub async fn run(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult> {
        match self.run_inner(workflow, cancel).await {
            Ok(result) => {
                info!(
                    workflow_id = %workflow.id,
                    steps = result.summary.total_steps,
                    "Simulation finished"
                );
                self.publish(SimulationEvent::Finished(result.summary.clone()));
                Ok(result)
            }
            Err(e) => {
                warn!(workflow_id = %workflow.id, error = %e, "Simulation did not complete");
                self.publish(SimulationEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult> {
        let walk = Walk::new(workflow, &self.catalog)?;

        info!(workflow_id = %workflow.id, nodes = workflow.nodes.len(), "Simulation started");
        self.publish(SimulationEvent::Started {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
        });
        self.pause(self.start_delay, cancel).await?;

        let mut steps = Vec::new();
        for step in walk {
            debug!(
                step = step.step,
                node_id = %step.node_id,
                status = %step.status,
                "Simulation step"
            );
            self.publish(SimulationEvent::Step(step.clone()));
            steps.push(step);
            self.pause(self.step_delay, cancel).await?;
        }

        Ok(self.summarize(steps))
    }

    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(HrflowError::Cancelled);
        }
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(HrflowError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn summarize(&self, steps: Vec<SimulationStep>) -> SimulationResult {
        let paced = u32::try_from(steps.len())
            .ok()
            .and_then(|n| self.step_delay.checked_mul(n))
            .unwrap_or(Duration::MAX);
        let nominal = self.start_delay.saturating_add(paced);
        SimulationResult {
            success: true,
            summary: SimulationSummary {
                total_steps: steps.len(),
                completed_at: Utc::now(),
                success_rate: "100%".to_string(),
                duration: format!("{:.1}s", nominal.as_secs_f64()),
            },
            steps,
        }
    }

    fn publish(&self, event: SimulationEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
