// ABOUTME: Task module for flowtask descriptors and behaviors
// ABOUTME: Exports task metadata, the behavior trait, and task error types

pub mod behavior;
pub mod descriptor;
pub mod error;

pub use behavior::{Task, TaskBehavior, Values};
pub use descriptor::{FlowMembership, MembershipSpec, NameList, TaskDescriptor, DEFAULT_PRIORITY};
pub use error::{Result, TaskError};
