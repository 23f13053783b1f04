// ABOUTME: Flow builder turning registry entries into a validated execution plan
// ABOUTME: Stable priority ordering plus provision and requirement checks

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::error::{FlowError, Result};
use super::registry::FlowEntry;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub task: Task,
    pub priority: i64,
}

/// Ordered, validated steps for one run of one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    flow: String,
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.task.identity()).collect()
    }

    /// Every name the plan writes to the store, in execution order.
    pub fn provided_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.task.provides().iter().map(String::as_str))
            .collect()
    }
}

pub struct FlowBuilder;

impl FlowBuilder {
    /// Sort entries by ascending priority and validate the resulting order.
    ///
    /// Entries sharing a priority keep their registration order. `initial`
    /// lists the names present in the store before the first step runs.
    /// Duplicate tasks are reported first, then duplicate provisions, then
    /// the first unsatisfied requirement in plan order.
    pub fn build<'a, I>(flow: &str, entries: &[FlowEntry], initial: I) -> Result<ExecutionPlan>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<&FlowEntry> = entries.iter().collect();
        // slice::sort_by_key is stable
        sorted.sort_by_key(|entry| entry.priority);

        let mut identities: HashSet<&str> = HashSet::new();
        for entry in &sorted {
            if !identities.insert(entry.task.identity()) {
                return Err(FlowError::DuplicateTask {
                    flow: flow.to_string(),
                    task: entry.task.identity().to_string(),
                });
            }
        }

        // Provisions are checked across the whole plan before any requirement
        let mut providers: HashMap<&str, &str> = HashMap::new();
        for entry in &sorted {
            let task = &entry.task;
            for name in task.provides() {
                if let Some(first) = providers.insert(name.as_str(), task.identity()) {
                    return Err(FlowError::DuplicateProvision {
                        flow: flow.to_string(),
                        name: name.clone(),
                        first: first.to_string(),
                        second: task.identity().to_string(),
                    });
                }
            }
        }

        let mut available: HashSet<&str> = initial.into_iter().collect();
        for entry in &sorted {
            let task = &entry.task;
            if let Some(name) = task
                .requires()
                .iter()
                .find(|name| !available.contains(name.as_str()))
            {
                return Err(FlowError::UnsatisfiedRequirement {
                    flow: flow.to_string(),
                    task: task.identity().to_string(),
                    name: name.clone(),
                });
            }
            available.extend(task.provides().iter().map(String::as_str));
        }

        let steps: Vec<PlanStep> = sorted
            .into_iter()
            .map(|entry| PlanStep {
                task: entry.task.clone(),
                priority: entry.priority,
            })
            .collect();

        debug!(
            "Built plan for flow '{}': {:?}",
            flow,
            steps.iter().map(|s| s.task.identity()).collect::<Vec<_>>()
        );

        Ok(ExecutionPlan {
            flow: flow.to_string(),
            steps,
        })
    }
}
