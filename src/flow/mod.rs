// ABOUTME: Flow module for registration and plan construction
// ABOUTME: Exports the flow registry, the plan builder, and flow error types

pub mod builder;
pub mod error;
pub mod registry;

pub use builder::{ExecutionPlan, FlowBuilder, PlanStep};
pub use error::{FlowError, Result};
pub use registry::{FlowEntry, FlowRegistry};
