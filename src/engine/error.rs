// ABOUTME: Error types for flow execution
// ABOUTME: Separates build-time flow errors from failures raised while steps run

use thiserror::Error;

use crate::flow::FlowError;
use crate::task::TaskError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Task {task} broke its output contract: expected {expected:?}, returned {actual:?}")]
    ContractViolation {
        task: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Task execution failed: {task} - {source}")]
    ActionFailure {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("Internal engine fault: {message}")]
    Internal { message: String },
}

impl ExecutionError {
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionError::ContractViolation { task, .. }
            | ExecutionError::ActionFailure { task, .. } => Some(task),
            ExecutionError::Flow(FlowError::UnsatisfiedRequirement { task, .. })
            | ExecutionError::Flow(FlowError::DuplicateTask { task, .. }) => Some(task),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
