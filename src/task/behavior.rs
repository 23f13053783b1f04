// ABOUTME: Task behavior trait with forward and compensating actions
// ABOUTME: Pairs a descriptor with its behavior into the unit the registry stores

use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use super::descriptor::TaskDescriptor;
use super::error::Result;

/// Named values passed into and returned from a task action.
pub type Values = IndexMap<String, serde_json::Value>;

#[async_trait]
pub trait TaskBehavior: Send + Sync {
    /// Forward action. Must return exactly the names the task declares in `provides`.
    async fn execute(&self, inputs: &Values) -> Result<Values>;

    /// Compensating action run during rollback.
    ///
    /// `result` is `None` when the forward action never produced outputs.
    async fn revert(&self, _result: Option<&Values>, _inputs: &Values) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Task {
    descriptor: Arc<TaskDescriptor>,
    behavior: Arc<dyn TaskBehavior>,
}

impl Task {
    pub fn new(descriptor: TaskDescriptor, behavior: Arc<dyn TaskBehavior>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            behavior,
        }
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn behavior(&self) -> &dyn TaskBehavior {
        self.behavior.as_ref()
    }

    pub fn identity(&self) -> &str {
        self.descriptor.identity()
    }

    pub fn requires(&self) -> &[String] {
        self.descriptor.requires()
    }

    pub fn provides(&self) -> &[String] {
        self.descriptor.provides()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

// Behaviors are opaque; two tasks are equal when they describe the same work.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}
