// ABOUTME: Flow registry mapping flow names to registered task entries
// ABOUTME: Append-only; ordering is left to the flow builder

use indexmap::IndexMap;
use tracing::debug;

use super::error::{FlowError, Result};
use crate::task::Task;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowEntry {
    pub task: Task,
    pub priority: i64,
}

/// Flow name to entries, in registration order.
///
/// The registry never sorts or deduplicates. Loaders are responsible for not
/// registering the same source twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowRegistry {
    flows: IndexMap<String, Vec<FlowEntry>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, flow: impl Into<String>, task: Task, priority: i64) {
        let flow = flow.into();
        debug!(
            "Registering task '{}' in flow '{}' at priority {}",
            task.identity(),
            flow,
            priority
        );
        self.flows
            .entry(flow)
            .or_default()
            .push(FlowEntry { task, priority });
    }

    /// Register a task under every flow its descriptor belongs to.
    pub fn register_task(&mut self, task: Task) {
        for membership in task.descriptor().memberships().to_vec() {
            self.register(membership.flow, task.clone(), membership.priority);
        }
    }

    /// Entries for a flow, failing with `UnknownFlow` when there are none.
    pub fn lookup(&self, flow: &str) -> Result<&[FlowEntry]> {
        match self.flows.get(flow) {
            Some(entries) if !entries.is_empty() => Ok(entries),
            _ => Err(FlowError::UnknownFlow {
                flow: flow.to_string(),
            }),
        }
    }

    pub fn contains(&self, flow: &str) -> bool {
        self.lookup(flow).is_ok()
    }

    pub fn flow_names(&self) -> Vec<&str> {
        self.flows
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flow_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of entries across all flows.
    pub fn entry_count(&self) -> usize {
        self.flows.values().map(Vec::len).sum()
    }
}
