// ABOUTME: Task definition schema for YAML units and metadata for native tasks
// ABOUTME: Both forms resolve to a TaskDescriptor with normalized flow membership

use serde::{Deserialize, Serialize};

use crate::task::{MembershipSpec, NameList, TaskDescriptor};

/// Explicit membership entry: `[flow, priority]` or `{flow, priority}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowAttr {
    Pair((String, i64)),
    Entry { flow: String, priority: i64 },
}

impl FlowAttr {
    pub fn into_pair(self) -> (String, i64) {
        match self {
            FlowAttr::Pair(pair) => pair,
            FlowAttr::Entry { flow, priority } => (flow, priority),
        }
    }
}

/// One entry under `tasks:` in a YAML unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    /// Behavior kind looked up in the catalog
    #[serde(default)]
    pub kind: Option<String>,

    /// Identity override; the definition key is used otherwise
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub requires: NameList,

    #[serde(default)]
    pub provides: NameList,

    #[serde(default)]
    pub flow_name: Option<NameList>,

    #[serde(default)]
    pub priority: Option<i64>,

    /// Overrides `flow_name` and `priority` when present
    #[serde(default)]
    pub flow_attrs: Option<Vec<FlowAttr>>,

    /// Base definitions that are never registered
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default)]
    pub config: serde_yaml::Value,
}

impl TaskDefinition {
    pub fn identity<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn membership(&self) -> MembershipSpec {
        match &self.flow_attrs {
            Some(attrs) => {
                MembershipSpec::Explicit(attrs.iter().cloned().map(FlowAttr::into_pair).collect())
            }
            None => MembershipSpec::Simple {
                flows: self.flow_name.clone().unwrap_or_default(),
                priority: self.priority,
            },
        }
    }

    pub fn descriptor(&self, key: &str) -> crate::task::Result<TaskDescriptor> {
        TaskDescriptor::new(
            self.identity(key),
            self.requires.clone().into_vec(),
            self.provides.clone().into_vec(),
            self.membership(),
        )
    }
}

/// Metadata a native task declares about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskMetadata {
    pub name: String,
    pub requires: Vec<String>,
    pub provides: Vec<String>,
    pub flow_name: NameList,
    pub priority: Option<i64>,
    pub flow_attrs: Option<Vec<(String, i64)>>,
}

impl TaskMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn requires(mut self, names: &[&str]) -> Self {
        self.requires = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn provides(mut self, names: &[&str]) -> Self {
        self.provides = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn flow_name(mut self, flows: impl Into<NameList>) -> Self {
        self.flow_name = flows.into();
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn flow_attr(mut self, flow: impl Into<String>, priority: i64) -> Self {
        self.flow_attrs
            .get_or_insert_with(Vec::new)
            .push((flow.into(), priority));
        self
    }

    pub fn membership(&self) -> MembershipSpec {
        match &self.flow_attrs {
            Some(pairs) => MembershipSpec::Explicit(pairs.clone()),
            None => MembershipSpec::Simple {
                flows: self.flow_name.clone(),
                priority: self.priority,
            },
        }
    }

    pub fn descriptor(&self) -> crate::task::Result<TaskDescriptor> {
        TaskDescriptor::new(
            self.name.clone(),
            self.requires.clone(),
            self.provides.clone(),
            self.membership(),
        )
    }
}

/// A compiled-in task that describes its own flow membership.
pub trait DeclaredTask {
    fn metadata(&self) -> TaskMetadata;
}
