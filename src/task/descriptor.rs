// ABOUTME: Immutable task metadata and flow membership normalization
// ABOUTME: Resolves explicit and simple membership forms into one canonical list

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::{Result, TaskError};

/// Priority used when a definition names its flows but no priority.
pub const DEFAULT_PRIORITY: i64 = 500;

/// One (flow, priority) pair a task is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMembership {
    pub flow: String,
    pub priority: i64,
}

impl FlowMembership {
    pub fn new(flow: impl Into<String>, priority: i64) -> Self {
        Self {
            flow: flow.into(),
            priority,
        }
    }
}

/// A single name or a list of names, as accepted in task definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameList {
    One(String),
    Many(Vec<String>),
}

impl NameList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            NameList::One(name) => vec![name],
            NameList::Many(names) => names,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NameList::One(_) => 1,
            NameList::Many(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NameList {
    fn default() -> Self {
        NameList::Many(Vec::new())
    }
}

impl From<&str> for NameList {
    fn from(name: &str) -> Self {
        NameList::One(name.to_string())
    }
}

impl From<Vec<&str>> for NameList {
    fn from(names: Vec<&str>) -> Self {
        NameList::Many(names.into_iter().map(str::to_string).collect())
    }
}

/// Flow membership as declared, before normalization.
///
/// `Explicit` pairs win over the `Simple` form whenever both are present in a
/// definition; downstream code only ever sees the normalized list.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipSpec {
    Explicit(Vec<(String, i64)>),
    Simple {
        flows: NameList,
        priority: Option<i64>,
    },
}

impl MembershipSpec {
    pub fn simple(flows: impl Into<NameList>, priority: Option<i64>) -> Self {
        MembershipSpec::Simple {
            flows: flows.into(),
            priority,
        }
    }

    /// Resolve to the canonical `(flow, priority)` list.
    pub fn normalize(self) -> Vec<FlowMembership> {
        match self {
            MembershipSpec::Explicit(pairs) => pairs
                .into_iter()
                .map(|(flow, priority)| FlowMembership { flow, priority })
                .collect(),
            MembershipSpec::Simple { flows, priority } => {
                let priority = priority.unwrap_or(DEFAULT_PRIORITY);
                flows
                    .into_vec()
                    .into_iter()
                    .map(|flow| FlowMembership { flow, priority })
                    .collect()
            }
        }
    }
}

impl Default for MembershipSpec {
    fn default() -> Self {
        MembershipSpec::Simple {
            flows: NameList::default(),
            priority: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    identity: String,
    requires: Vec<String>,
    provides: Vec<String>,
    memberships: Vec<FlowMembership>,
}

impl TaskDescriptor {
    /// Build a descriptor, normalizing its membership and checking that
    /// `requires`/`provides` behave as ordered sets.
    pub fn new(
        identity: impl Into<String>,
        requires: Vec<String>,
        provides: Vec<String>,
        membership: MembershipSpec,
    ) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(TaskError::InvalidDescriptor {
                task: identity,
                reason: "identity cannot be empty".to_string(),
            });
        }

        check_unique(&identity, "requires", &requires)?;
        check_unique(&identity, "provides", &provides)?;

        // A flow listed twice is kept; building that flow's plan rejects it
        let memberships = membership.normalize();
        if memberships.iter().any(|m| m.flow.trim().is_empty()) {
            return Err(TaskError::InvalidDescriptor {
                task: identity,
                reason: "flow name cannot be empty".to_string(),
            });
        }

        Ok(Self {
            identity,
            requires,
            provides,
            memberships,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn provides(&self) -> &[String] {
        &self.provides
    }

    pub fn memberships(&self) -> &[FlowMembership] {
        &self.memberships
    }

    pub fn priority_in(&self, flow: &str) -> Option<i64> {
        self.memberships
            .iter()
            .find(|m| m.flow == flow)
            .map(|m| m.priority)
    }
}

fn check_unique(identity: &str, field: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(TaskError::InvalidDescriptor {
                task: identity.to_string(),
                reason: format!("'{}' appears more than once in {}", name, field),
            });
        }
    }
    Ok(())
}
