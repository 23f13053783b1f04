// ABOUTME: Execution engine module for flowtask
// ABOUTME: Runs validated plans against a store with observation and rollback

pub mod error;
pub mod executor;
pub mod observer;
pub mod result;
pub mod store;

pub use error::{ExecutionError, Result};
pub use executor::FlowEngine;
pub use observer::{EventLog, ObservationSink, RunEvent, TracingSink};
pub use result::{
    CompensationFailure, RunFailure, RunReport, RunState, StepResult, StepStatus,
};
pub use store::Store;
