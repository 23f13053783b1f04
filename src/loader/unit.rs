// ABOUTME: Unit loader qualifying task candidates and registering them by flow
// ABOUTME: Tracks loaded units so a source is never registered twice

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::collection::enumerate_units;
use super::definition::TaskDefinition;
use super::error::{LoaderError, Result};
use super::report::LoadReport;
use super::source::{Candidate, TaskSource, YamlUnit};
use crate::flow::FlowRegistry;
use crate::task::Task;
use crate::tasks::{BehaviorCatalog, KindContext};

/// Discovery capability: one unit, or every unit under a location.
pub trait FlowLoader {
    /// Register every qualifying task of one source.
    ///
    /// Per-definition problems land in the report; only IO faults are errors.
    fn load_unit(
        &mut self,
        source: &dyn TaskSource,
        registry: &mut FlowRegistry,
    ) -> Result<LoadReport>;

    /// Drop per-unit transient state
    fn reset(&mut self);

    fn recursive(&self) -> bool {
        true
    }

    fn load_collection(
        &mut self,
        location: &Path,
        registry: &mut FlowRegistry,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::new();
        for path in enumerate_units(location, self.recursive())? {
            self.reset();
            let unit = match YamlUnit::from_path(&path) {
                Ok(unit) => unit,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                    continue;
                }
            };
            report.merge(self.load_unit(&unit, registry)?);
        }
        self.reset();
        Ok(report)
    }
}

/// State that belongs to the unit currently being loaded.
#[derive(Debug, Default)]
struct UnitState {
    unit: Option<String>,
    staged: Vec<Task>,
    identities: HashSet<String>,
}

#[derive(Debug)]
pub struct TaskLoader {
    catalog: Arc<BehaviorCatalog>,
    loaded_units: HashSet<String>,
    recursive: bool,
    state: UnitState,
}

impl TaskLoader {
    pub fn new(catalog: Arc<BehaviorCatalog>) -> Self {
        Self {
            catalog,
            loaded_units: HashSet::new(),
            recursive: true,
            state: UnitState::default(),
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn has_loaded(&self, unit: &str) -> bool {
        self.loaded_units.contains(unit)
    }

    fn unit_name(&self) -> &str {
        self.state.unit.as_deref().unwrap_or("<unknown>")
    }

    /// Turn one candidate into a task, `None` when it does not qualify.
    fn qualify(&self, key: &str, candidate: Candidate) -> Result<Option<Task>> {
        let unit = self.unit_name();

        match candidate {
            Candidate::Yaml(value) => {
                let definition: TaskDefinition = serde_yaml::from_value(value)
                    .map_err(|e| LoaderError::malformed(unit, key, e))?;

                if definition.is_abstract {
                    debug!("Skipping abstract definition '{}' in {}", key, unit);
                    return Ok(None);
                }

                let kind = definition
                    .kind
                    .as_deref()
                    .ok_or_else(|| LoaderError::malformed(unit, key, "missing 'kind'"))?;

                let descriptor = definition
                    .descriptor(key)
                    .map_err(|e| LoaderError::malformed(unit, key, e))?;

                let context = KindContext {
                    task: descriptor.identity(),
                    requires: descriptor.requires(),
                    provides: descriptor.provides(),
                };
                let behavior = self
                    .catalog
                    .create(kind, &context, &definition.config)
                    .map_err(|e| LoaderError::malformed(unit, key, e))?;

                Ok(Some(Task::new(descriptor, behavior)))
            }
            Candidate::Native { metadata, behavior } => {
                let descriptor = metadata
                    .descriptor()
                    .map_err(|e| LoaderError::malformed(unit, key, e))?;
                Ok(Some(Task::new(descriptor, behavior)))
            }
        }
    }
}

impl FlowLoader for TaskLoader {
    #[instrument(skip(self, source, registry), fields(unit = %source.name()))]
    fn load_unit(
        &mut self,
        source: &dyn TaskSource,
        registry: &mut FlowRegistry,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::new();
        let unit = source.name().to_string();

        if self.loaded_units.contains(&unit) {
            warn!("Task source {} was already loaded, skipping", unit);
            report.skipped.push(unit);
            return Ok(report);
        }

        self.reset();
        self.state.unit = Some(unit.clone());

        let candidates = match source.candidates() {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}", e);
                report.failures.push(e);
                self.reset();
                return Ok(report);
            }
        };

        for (key, candidate) in candidates {
            if key.starts_with('_') {
                debug!("Skipping internal definition '{}' in {}", key, unit);
                report.skipped.push(key);
                continue;
            }

            let task = match self.qualify(&key, candidate) {
                Ok(Some(task)) => task,
                Ok(None) => {
                    report.skipped.push(key);
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                    continue;
                }
            };

            if !self.state.identities.insert(task.identity().to_string()) {
                let e = LoaderError::malformed(
                    &unit,
                    &key,
                    format!("task '{}' is already defined in this unit", task.identity()),
                );
                warn!("{}", e);
                report.failures.push(e);
                continue;
            }

            if task.descriptor().memberships().is_empty() {
                debug!("Task '{}' belongs to no flow, not registering", task.identity());
                report.skipped.push(key);
                continue;
            }

            self.state.staged.push(task);
        }

        for task in std::mem::take(&mut self.state.staged) {
            report.entries += task.descriptor().memberships().len();
            report.registered.push(task.identity().to_string());
            registry.register_task(task);
        }

        info!("Loaded task source {}: {}", unit, report.summary());
        self.loaded_units.insert(unit);
        self.reset();
        Ok(report)
    }

    fn reset(&mut self) {
        self.state = UnitState::default();
    }

    fn recursive(&self) -> bool {
        self.recursive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::definition::{DeclaredTask, TaskMetadata};
    use crate::loader::source::NativeUnit;
    use crate::task::{TaskBehavior, Values};
    use async_trait::async_trait;

    fn loader() -> TaskLoader {
        TaskLoader::new(Arc::new(BehaviorCatalog::new()))
    }

    const ONBOARD: &str = r#"
tasks:
  notify:
    kind: value
    name: Notify
    provides: sent
    flow_name: onboard
    priority: 200
    config:
      values: { sent: true }
  validate:
    kind: value
    name: Validate
    provides: ok
    flow_name: onboard
    priority: 100
    config:
      values: { ok: true }
"#;

    #[test]
    fn test_load_unit_registers_in_declaration_order() {
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("onboard.yaml", ONBOARD), &mut registry)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.registered, vec!["Notify", "Validate"]);
        let entries = registry.lookup("onboard").unwrap();
        assert_eq!(entries[0].task.identity(), "Notify");
        assert_eq!(entries[0].priority, 200);
        assert_eq!(entries[1].priority, 100);
    }

    #[test]
    fn test_malformed_definitions_do_not_stop_the_unit() {
        let yaml = r#"
tasks:
  no_kind:
    provides: a
    flow_name: f
  bad_attrs:
    kind: value
    flow_attrs: [[f]]
  dup_provides:
    kind: value
    provides: [b, b]
    flow_name: f
  twice:
    kind: value
    flow_attrs: [[f, 1], [f, 2]]
  unknown_kind:
    kind: teleport
    flow_name: f
  bad_config:
    kind: value
    provides: c
    flow_name: f
    config:
      values: { d: 1 }
  good:
    kind: value
    provides: e
    flow_name: f
    config:
      values: { e: 1 }
"#;
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("mixed.yaml", yaml), &mut registry)
            .unwrap();

        assert_eq!(report.registered, vec!["twice", "good"]);
        assert_eq!(report.failures.len(), 5);
        for failure in &report.failures {
            assert!(matches!(
                failure,
                LoaderError::MalformedTaskDefinition { unit, .. } if unit == "mixed.yaml"
            ));
        }
        assert_eq!(registry.entry_count(), 3);
    }

    #[test]
    fn test_same_flow_twice_registers_both_entries() {
        let yaml = r#"
tasks:
  audit:
    kind: value
    flow_attrs: [[onboard, 50], [onboard, 300]]
"#;
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("audit.yaml", yaml), &mut registry)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.entries, 2);
        let priorities: Vec<i64> = registry
            .lookup("onboard")
            .unwrap()
            .iter()
            .map(|entry| entry.priority)
            .collect();
        assert_eq!(priorities, vec![50, 300]);
    }

    #[test]
    fn test_internal_and_abstract_definitions_are_skipped() {
        let yaml = r#"
tasks:
  _helper:
    kind: value
    flow_name: f
  base:
    abstract: true
    flow_name: f
  loose:
    kind: value
"#;
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("skip.yaml", yaml), &mut registry)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.skipped, vec!["_helper", "base", "loose"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_unit_is_not_loaded_twice() {
        let mut loader = loader();
        let mut registry = FlowRegistry::new();
        let unit = YamlUnit::from_yaml("onboard.yaml", ONBOARD);

        loader.load_unit(&unit, &mut registry).unwrap();
        let again = loader.load_unit(&unit, &mut registry).unwrap();

        assert!(loader.has_loaded("onboard.yaml"));
        assert_eq!(again.skipped, vec!["onboard.yaml"]);
        assert_eq!(registry.lookup("onboard").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_identity_in_unit() {
        let yaml = r#"
tasks:
  first:
    kind: value
    name: Same
    flow_name: f
  second:
    kind: value
    name: Same
    flow_name: g
"#;
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("dup.yaml", yaml), &mut registry)
            .unwrap();

        assert_eq!(report.registered, vec!["Same"]);
        assert_eq!(report.failures.len(), 1);
        assert!(!registry.contains("g"));
    }

    #[test]
    fn test_malformed_unit_is_reported() {
        let mut registry = FlowRegistry::new();
        let report = loader()
            .load_unit(&YamlUnit::from_yaml("bad.yaml", "tasks: [oops"), &mut registry)
            .unwrap();

        assert!(matches!(
            report.failures.as_slice(),
            [LoaderError::MalformedUnit { .. }]
        ));
    }

    struct Audit;

    impl DeclaredTask for Audit {
        fn metadata(&self) -> TaskMetadata {
            TaskMetadata::new("Audit")
                .provides(&["audited"])
                .flow_attr("onboard", 300)
                .flow_attr("offboard", 50)
        }
    }

    #[async_trait]
    impl TaskBehavior for Audit {
        async fn execute(&self, _inputs: &Values) -> crate::task::Result<Values> {
            let mut out = Values::new();
            out.insert("audited".to_string(), serde_json::json!(true));
            Ok(out)
        }
    }

    #[test]
    fn test_native_unit() {
        let mut registry = FlowRegistry::new();
        let unit = NativeUnit::new("builtin").with_task(Audit);
        let report = loader().load_unit(&unit, &mut registry).unwrap();

        assert_eq!(report.entries, 2);
        assert_eq!(registry.lookup("onboard").unwrap()[0].priority, 300);
        assert_eq!(registry.lookup("offboard").unwrap()[0].priority, 50);
    }
}
