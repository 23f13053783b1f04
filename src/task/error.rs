// ABOUTME: Error types for task descriptors and task behaviors
// ABOUTME: Defines failures raised while describing, configuring, executing, or reverting a task

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid task descriptor '{task}': {reason}")]
    InvalidDescriptor { task: String, reason: String },

    #[error("Configuration error for task {task}: {message}")]
    ConfigError { task: String, message: String },

    #[error("{0}")]
    Failed(String),

    #[error("Task timeout: {task} - exceeded {seconds}s")]
    Timeout { task: String, seconds: u64 },

    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::RenderError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
