// ABOUTME: Observation events emitted during a flow run and the sinks receiving them
// ABOUTME: A scope guard ends and flushes every attached sink on all exit paths

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use super::result::RunState;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunStarted {
        flow: String,
    },
    StepCompleted {
        task: String,
        duration: Duration,
    },
    StepFailed {
        task: String,
        error: String,
    },
    StepReverted {
        task: String,
        success: bool,
    },
    RunEnded {
        state: RunState,
    },
}

pub trait ObservationSink: Send + Sync {
    fn on_event(&self, event: &RunEvent);

    /// Called once when the run releases the sink.
    fn flush(&self) {}
}

/// Renders run progress and step timings through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { flow } => info!("Flow '{}' started", flow),
            RunEvent::StepCompleted { task, duration } => {
                info!("Task '{}' completed in {:.3}s", task, duration.as_secs_f64())
            }
            RunEvent::StepFailed { task, error } => error!("Task '{}' failed: {}", task, error),
            RunEvent::StepReverted { task, success } => {
                if *success {
                    info!("Task '{}' reverted", task)
                } else {
                    warn!("Task '{}' could not be reverted", task)
                }
            }
            RunEvent::RunEnded { state } => info!("Flow run ended: {}", state),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RunEvent>>,
    flushes: Mutex<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().map(|count| *count).unwrap_or(0)
    }

    /// Names of tasks whose completion was observed, in order.
    pub fn completed_tasks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::StepCompleted { task, .. } => Some(task),
                _ => None,
            })
            .collect()
    }
}

impl ObservationSink for EventLog {
    fn on_event(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn flush(&self) {
        if let Ok(mut count) = self.flushes.lock() {
            *count += 1;
        }
    }
}

/// Sinks held for the duration of one run.
///
/// Dropping the scope emits `RunEnded` with the recorded state (`Failed` if
/// none was recorded) and flushes each sink.
pub(crate) struct ObservationScope<'a> {
    sinks: &'a [Arc<dyn ObservationSink>],
    final_state: Option<RunState>,
}

impl<'a> ObservationScope<'a> {
    pub(crate) fn open(sinks: &'a [Arc<dyn ObservationSink>], flow: &str) -> Self {
        let scope = Self {
            sinks,
            final_state: None,
        };
        scope.emit(RunEvent::RunStarted {
            flow: flow.to_string(),
        });
        scope
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        for sink in self.sinks {
            sink.on_event(&event);
        }
    }

    pub(crate) fn finish(&mut self, state: RunState) {
        self.final_state = Some(state);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        let state = self.final_state.unwrap_or(RunState::Failed);
        self.emit(RunEvent::RunEnded { state });
        for sink in self.sinks {
            sink.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_emits_run_ended_and_flushes() {
        let log = Arc::new(EventLog::new());
        let sinks: Vec<Arc<dyn ObservationSink>> = vec![log.clone()];

        {
            let mut scope = ObservationScope::open(&sinks, "onboard");
            scope.emit(RunEvent::StepCompleted {
                task: "Validate".to_string(),
                duration: Duration::from_millis(1),
            });
            scope.finish(RunState::Completed);
        }

        assert_eq!(
            log.events(),
            vec![
                RunEvent::RunStarted {
                    flow: "onboard".to_string()
                },
                RunEvent::StepCompleted {
                    task: "Validate".to_string(),
                    duration: Duration::from_millis(1),
                },
                RunEvent::RunEnded {
                    state: RunState::Completed
                },
            ]
        );
        assert_eq!(log.flush_count(), 1);
        assert_eq!(log.completed_tasks(), vec!["Validate"]);
    }

    #[test]
    fn test_abandoned_scope_reports_failed() {
        let log = Arc::new(EventLog::new());
        let sinks: Vec<Arc<dyn ObservationSink>> = vec![log.clone()];

        drop(ObservationScope::open(&sinks, "onboard"));

        assert_eq!(
            log.events().last(),
            Some(&RunEvent::RunEnded {
                state: RunState::Failed
            })
        );
    }
}
