// ABOUTME: Built-in task kinds and the catalog that resolves a kind name to a behavior
// ABOUTME: Contains value, command, and template kinds for definitions loaded from YAML

pub mod command;
pub mod template;
pub mod value;

use std::collections::HashMap;
use std::sync::Arc;

use crate::task::{Result, TaskBehavior, TaskError};

/// What a kind factory knows about the definition it is building a behavior for.
#[derive(Debug, Clone, Copy)]
pub struct KindContext<'a> {
    pub task: &'a str,
    pub requires: &'a [String],
    pub provides: &'a [String],
}

impl KindContext<'_> {
    pub fn config_error(&self, message: impl Into<String>) -> TaskError {
        TaskError::ConfigError {
            task: self.task.to_string(),
            message: message.into(),
        }
    }

    /// The one provided name a single-output kind writes to.
    pub fn single_output(&self, kind: &str) -> Result<String> {
        match self.provides {
            [name] => Ok(name.clone()),
            _ => Err(self.config_error(format!(
                "{} tasks must provide exactly one name, found {}",
                kind,
                self.provides.len()
            ))),
        }
    }
}

pub trait TaskKind: Send + Sync {
    fn kind(&self) -> &'static str;

    fn create(
        &self,
        context: &KindContext<'_>,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn TaskBehavior>>;
}

pub struct BehaviorCatalog {
    kinds: HashMap<String, Box<dyn TaskKind>>,
}

impl BehaviorCatalog {
    pub fn new() -> Self {
        let mut catalog = Self::empty();

        catalog.register(Box::new(value::ValueKind));
        catalog.register(Box::new(command::CommandKind));
        catalog.register(Box::new(template::TemplateKind));

        catalog
    }

    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: Box<dyn TaskKind>) {
        self.kinds.insert(kind.kind().to_string(), kind);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn TaskKind> {
        self.kinds.get(kind).map(|k| k.as_ref())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Instantiate the behavior for a definition of the given kind
    pub fn create(
        &self,
        kind: &str,
        context: &KindContext<'_>,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn TaskBehavior>> {
        match self.get(kind) {
            Some(factory) => factory.create(context, config),
            None => Err(context.config_error(format!(
                "unknown task kind '{}'. Supported kinds: {:?}",
                kind,
                self.list_kinds()
            ))),
        }
    }

    pub fn list_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.kinds.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BehaviorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorCatalog")
            .field("kinds", &self.list_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let catalog = BehaviorCatalog::new();
        assert_eq!(catalog.list_kinds(), vec!["command", "template", "value"]);
    }

    #[test]
    fn test_unknown_kind_is_config_error() {
        let catalog = BehaviorCatalog::new();
        let provides = vec!["x".to_string()];
        let context = KindContext {
            task: "mystery",
            requires: &[],
            provides: &provides,
        };

        let result = catalog.create("teleport", &context, &serde_yaml::Value::Null);
        assert!(matches!(result, Err(TaskError::ConfigError { .. })));
    }

    #[test]
    fn test_single_output_requires_one_name() {
        let provides = vec!["a".to_string(), "b".to_string()];
        let context = KindContext {
            task: "t",
            requires: &[],
            provides: &provides,
        };
        assert!(context.single_output("template").is_err());
    }
}
