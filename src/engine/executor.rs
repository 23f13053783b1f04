// ABOUTME: Flow engine running a validated plan against a store
// ABOUTME: Executes steps in order and unwinds completed steps in reverse on failure

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::error::{ExecutionError, Result};
use super::observer::{ObservationScope, ObservationSink, RunEvent, TracingSink};
use super::result::{CompensationFailure, RunFailure, RunReport, RunState, StepResult, StepStatus};
use super::store::Store;
use crate::flow::{ExecutionPlan, FlowBuilder, FlowRegistry};
use crate::task::{Task, Values};

/// A step eligible for its compensating action.
struct Compensation {
    index: usize,
    inputs: Values,
    result: Option<Values>,
}

pub struct FlowEngine {
    registry: Arc<FlowRegistry>,
    sinks: Vec<Arc<dyn ObservationSink>>,
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("flows", &self.registry.flow_names())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FlowEngine {
    /// Create an engine over a registry that is no longer being written to
    pub fn new(registry: Arc<FlowRegistry>) -> Self {
        Self {
            registry,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Attach a sink that reports progress and timings through `tracing`
    pub fn with_tracing(self) -> Self {
        self.with_sink(Arc::new(TracingSink))
    }

    /// Build and validate the plan for a flow without running it
    pub fn plan(&self, flow: &str, initial: &Store) -> Result<ExecutionPlan> {
        let entries = self.registry.lookup(flow)?;
        Ok(FlowBuilder::build(flow, entries, initial.keys())?)
    }

    /// Run a flow and return only the final store
    pub async fn run_flow(
        &self,
        flow: &str,
        params: Option<Store>,
    ) -> std::result::Result<Store, RunFailure> {
        self.run(flow, params).await.map(|report| report.store)
    }

    /// Run a flow to completion or rollback
    #[instrument(skip(self, params))]
    pub async fn run(
        &self,
        flow: &str,
        params: Option<Store>,
    ) -> std::result::Result<RunReport, RunFailure> {
        let mut store = params.unwrap_or_default();

        let plan = self.plan(flow, &store).map_err(|e| {
            warn!("Flow '{}' could not be built: {}", flow, e);
            RunFailure::before_run(flow, e)
        })?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let start_time = Utc::now();
        let started = Instant::now();
        info!(
            "Starting flow execution: {} (run_id: {}, {} steps)",
            flow,
            run_id,
            plan.len()
        );
        debug!("Run {} is {}", run_id, RunState::Built);

        let mut scope = ObservationScope::open(&self.sinks, flow);
        debug!("Run {} is {}", run_id, RunState::Running);

        let mut steps: Vec<StepResult> = plan
            .steps()
            .iter()
            .map(|step| StepResult::new(step.task.identity().to_string(), step.priority))
            .collect();
        let mut completed: Vec<Compensation> = Vec::with_capacity(plan.len());

        for (index, step) in plan.steps().iter().enumerate() {
            let task = &step.task;

            let inputs = match store.select(task.requires()) {
                Ok(inputs) => inputs,
                Err(missing) => {
                    let error = ExecutionError::Internal {
                        message: format!(
                            "value '{}' required by task {} is missing from the store",
                            missing,
                            task.identity()
                        ),
                    };
                    error!("{}", error);

                    if completed.is_empty() {
                        scope.finish(RunState::Failed);
                        return Err(RunFailure {
                            flow: flow.to_string(),
                            state: RunState::Failed,
                            error,
                            compensation_failures: Vec::new(),
                            steps,
                        });
                    }

                    completed.reverse();
                    let compensation_failures =
                        Self::rollback(&plan, completed, &mut steps, &scope).await;
                    scope.finish(RunState::RolledBack);
                    return Err(RunFailure {
                        flow: flow.to_string(),
                        state: RunState::RolledBack,
                        error,
                        compensation_failures,
                        steps,
                    });
                }
            };

            info!("Executing task: {} (priority: {})", task.identity(), step.priority);
            steps[index].mark_started();
            let step_started = Instant::now();
            let outcome = task.behavior().execute(&inputs).await;
            let elapsed = step_started.elapsed();

            let (error, partial) = match outcome {
                Ok(outputs) => match check_contract(task, &outputs) {
                    Ok(()) => {
                        for name in task.provides() {
                            if let Some(value) = outputs.get(name) {
                                store.insert(name.clone(), value.clone());
                            }
                        }
                        steps[index].mark_finished(StepStatus::Completed, elapsed, None);
                        scope.emit(RunEvent::StepCompleted {
                            task: task.identity().to_string(),
                            duration: elapsed,
                        });
                        completed.push(Compensation {
                            index,
                            inputs,
                            result: Some(outputs),
                        });
                        continue;
                    }
                    Err(violation) => (violation, Some(outputs)),
                },
                Err(source) => (
                    ExecutionError::ActionFailure {
                        task: task.identity().to_string(),
                        source,
                    },
                    None,
                ),
            };

            error!("Task {} failed: {}", task.identity(), error);
            steps[index].mark_finished(StepStatus::Failed, elapsed, Some(error.to_string()));
            scope.emit(RunEvent::StepFailed {
                task: task.identity().to_string(),
                error: error.to_string(),
            });

            // The failed step is compensated first, then completed steps newest to oldest.
            let mut pending = Vec::with_capacity(completed.len() + 1);
            pending.push(Compensation {
                index,
                inputs,
                result: partial,
            });
            pending.extend(completed.into_iter().rev());

            let compensation_failures = Self::rollback(&plan, pending, &mut steps, &scope).await;
            scope.finish(RunState::RolledBack);

            warn!(
                "Flow '{}' rolled back after {} failed ({} compensation failures)",
                flow,
                task.identity(),
                compensation_failures.len()
            );

            return Err(RunFailure {
                flow: flow.to_string(),
                state: RunState::RolledBack,
                error,
                compensation_failures,
                steps,
            });
        }

        scope.finish(RunState::Completed);
        let duration = started.elapsed();
        info!(
            "Flow execution completed in {:?} with status: {}",
            duration,
            RunState::Completed
        );

        Ok(RunReport {
            flow: flow.to_string(),
            run_id,
            state: RunState::Completed,
            start_time,
            duration,
            steps,
            store,
        })
    }

    /// Invoke compensating actions in the given order, continuing past failures
    async fn rollback(
        plan: &ExecutionPlan,
        pending: Vec<Compensation>,
        steps: &mut [StepResult],
        scope: &ObservationScope<'_>,
    ) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for compensation in pending {
            let task = &plan.steps()[compensation.index].task;
            debug!(
                "Reverting task {} (result available: {})",
                task.identity(),
                compensation.result.is_some()
            );

            match task
                .behavior()
                .revert(compensation.result.as_ref(), &compensation.inputs)
                .await
            {
                Ok(()) => {
                    steps[compensation.index].mark_reverted(None);
                    scope.emit(RunEvent::StepReverted {
                        task: task.identity().to_string(),
                        success: true,
                    });
                }
                Err(source) => {
                    error!("Revert of task {} failed: {}", task.identity(), source);
                    steps[compensation.index].mark_reverted(Some(source.to_string()));
                    scope.emit(RunEvent::StepReverted {
                        task: task.identity().to_string(),
                        success: false,
                    });
                    failures.push(CompensationFailure {
                        task: task.identity().to_string(),
                        source,
                    });
                }
            }
        }

        failures
    }
}

fn check_contract(task: &Task, outputs: &Values) -> Result<()> {
    let expected: HashSet<&str> = task.provides().iter().map(String::as_str).collect();
    let actual: HashSet<&str> = outputs.keys().map(String::as_str).collect();

    if expected == actual {
        return Ok(());
    }

    Err(ExecutionError::ContractViolation {
        task: task.identity().to_string(),
        expected: task.provides().to_vec(),
        actual: outputs.keys().cloned().collect(),
    })
}
