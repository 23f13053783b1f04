// ABOUTME: Error types for flow lookup and plan validation
// ABOUTME: Raised before any task of a run executes

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Flow not found: {flow}")]
    UnknownFlow { flow: String },

    #[error("Output '{name}' in flow '{flow}' is provided by both '{first}' and '{second}'")]
    DuplicateProvision {
        flow: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("Task '{task}' in flow '{flow}' requires '{name}', which nothing earlier provides")]
    UnsatisfiedRequirement {
        flow: String,
        task: String,
        name: String,
    },

    /// Same task entered twice in one flow, including one definition listing
    /// the flow twice. A build-time failure like `UnsatisfiedRequirement`.
    #[error("Task '{task}' is registered more than once in flow '{flow}'")]
    DuplicateTask { flow: String, task: String },
}

pub type Result<T> = std::result::Result<T, FlowError>;
