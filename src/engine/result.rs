// ABOUTME: Run states, per-step results, and the outcome types of a flow run
// ABOUTME: A run ends either in a report with the final store or in a structured failure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::error::ExecutionError;
use super::store::Store;
use crate::task::TaskError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunState {
    Built,
    Running,
    Completed,
    RolledBack,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::RolledBack | RunState::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Reverted,
    RevertFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub task: String,
    pub priority: i64,
    pub status: StepStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl StepResult {
    pub fn new(task: String, priority: i64) -> Self {
        Self {
            task,
            priority,
            status: StepStatus::Pending,
            start_time: None,
            end_time: None,
            duration: None,
            error: None,
        }
    }

    pub fn mark_started(&mut self) {
        self.status = StepStatus::Running;
        self.start_time = Some(Utc::now());
    }

    pub fn mark_finished(&mut self, status: StepStatus, duration: Duration, error: Option<String>) {
        self.status = status;
        self.end_time = Some(Utc::now());
        self.duration = Some(duration);
        self.error = error;
    }

    /// Record the outcome of the compensating action without touching timings.
    pub fn mark_reverted(&mut self, error: Option<String>) {
        self.status = match error {
            None => StepStatus::Reverted,
            Some(_) => StepStatus::RevertFailed,
        };
        if error.is_some() {
            self.error = error;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub flow: String,
    pub run_id: String,
    pub state: RunState,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub steps: Vec<StepResult>,
    pub store: Store,
}

impl RunReport {
    pub fn step(&self, task: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.task == task)
    }
}

/// A compensating action that itself failed. Attached to a failure, never its cause.
#[derive(Error, Debug)]
#[error("Compensation failed for task {task}: {source}")]
pub struct CompensationFailure {
    pub task: String,
    #[source]
    pub source: TaskError,
}

#[derive(Error, Debug)]
#[error("Flow '{flow}' ended {state}: {error}")]
pub struct RunFailure {
    pub flow: String,
    pub state: RunState,
    #[source]
    pub error: ExecutionError,
    pub compensation_failures: Vec<CompensationFailure>,
    pub steps: Vec<StepResult>,
}

impl RunFailure {
    /// Failure raised before any step could run.
    pub fn before_run(flow: &str, error: ExecutionError) -> Self {
        Self {
            flow: flow.to_string(),
            state: RunState::Failed,
            error,
            compensation_failures: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn reverted_tasks(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Reverted | StepStatus::RevertFailed))
            .map(|s| s.task.as_str())
            .collect()
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Built => write!(f, "built"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::RolledBack => write!(f, "rolled_back"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Reverted => write!(f, "reverted"),
            StepStatus::RevertFailed => write!(f, "revert_failed"),
        }
    }
}
