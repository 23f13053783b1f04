// ABOUTME: Main library module for the flowtask engine
// ABOUTME: Exports discovery, flow building, and execution as the public API

pub mod cli;
pub mod engine;
pub mod flow;
pub mod loader;
pub mod task;
pub mod tasks;

// Re-export commonly used types
pub use engine::{
    EventLog, ExecutionError, FlowEngine, ObservationSink, RunEvent, RunFailure, RunReport,
    RunState, Store,
};
pub use flow::{ExecutionPlan, FlowBuilder, FlowError, FlowRegistry};
pub use loader::{
    DeclaredTask, FlowLoader, LoadReport, LoaderError, NativeUnit, TaskLoader, TaskMetadata,
    YamlUnit,
};
pub use task::{MembershipSpec, Task, TaskBehavior, TaskDescriptor, TaskError, Values};
pub use tasks::BehaviorCatalog;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
