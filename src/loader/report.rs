// ABOUTME: Outcome of a discovery pass over one or more task sources
// ABOUTME: Collects registered tasks alongside the non-fatal failures met on the way

use super::error::LoaderError;

#[derive(Debug, Default)]
pub struct LoadReport {
    /// Identities of tasks registered, in registration order
    pub registered: Vec<String>,
    /// Registry entries added (one task may join several flows)
    pub entries: usize,
    /// Definitions and units passed over without error
    pub skipped: Vec<String>,
    pub failures: Vec<LoaderError>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.registered.extend(other.registered);
        self.entries += other.entries;
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} tasks registered ({} flow entries), {} skipped, {} failures",
            self.registered.len(),
            self.entries,
            self.skipped.len(),
            self.failures.len()
        )
    }
}
