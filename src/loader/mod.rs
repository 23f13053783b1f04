// ABOUTME: Task discovery from YAML units, native units, and directories of units
// ABOUTME: Populates a FlowRegistry and reports per-definition failures without aborting

pub mod collection;
pub mod definition;
pub mod error;
pub mod report;
pub mod source;
pub mod unit;

pub use collection::enumerate_units;
pub use definition::{DeclaredTask, FlowAttr, TaskDefinition, TaskMetadata};
pub use error::{LoaderError, Result};
pub use report::LoadReport;
pub use source::{Candidate, NativeUnit, TaskSource, YamlUnit};
pub use unit::{FlowLoader, TaskLoader};
