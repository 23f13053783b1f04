// ABOUTME: Value task kind returning literal values from its configuration
// ABOUTME: Useful for seeding flags and constants into a flow's store

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{KindContext, TaskKind};
use crate::task::{Result, TaskBehavior, Values};

pub struct ValueKind;

/// ```yaml
/// kind: value
/// provides: [ok]
/// config:
///   values:
///     ok: true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueConfig {
    #[serde(default)]
    pub values: Values,
}

#[derive(Debug, Clone)]
pub struct ValueTask {
    values: Values,
}

impl ValueTask {
    pub fn new(values: Values) -> Self {
        Self { values }
    }
}

#[async_trait]
impl TaskBehavior for ValueTask {
    async fn execute(&self, _inputs: &Values) -> Result<Values> {
        Ok(self.values.clone())
    }
}

impl TaskKind for ValueKind {
    fn kind(&self) -> &'static str {
        "value"
    }

    fn create(
        &self,
        context: &KindContext<'_>,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn TaskBehavior>> {
        let config: ValueConfig = if config.is_null() {
            ValueConfig::default()
        } else {
            serde_yaml::from_value(config.clone())
                .map_err(|e| context.config_error(format!("Invalid value configuration: {}", e)))?
        };

        for name in context.provides {
            if !config.values.contains_key(name) {
                return Err(context.config_error(format!("no value configured for '{}'", name)));
            }
        }
        for name in config.values.keys() {
            if !context.provides.contains(name) {
                return Err(context.config_error(format!(
                    "value '{}' is not listed in provides",
                    name
                )));
            }
        }

        Ok(Arc::new(ValueTask::new(config.values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_value_task_returns_configured_values() {
        let provides = vec!["ok".to_string()];
        let context = KindContext {
            task: "Validate",
            requires: &[],
            provides: &provides,
        };
        let config: serde_yaml::Value = serde_yaml::from_str("values: { ok: true }").unwrap();

        let behavior = ValueKind.create(&context, &config).unwrap();
        let outputs = behavior.execute(&Values::new()).await.unwrap();
        assert_eq!(outputs["ok"], json!(true));
    }

    #[test]
    fn test_value_config_must_match_provides() {
        let provides = vec!["ok".to_string(), "sent".to_string()];
        let context = KindContext {
            task: "Validate",
            requires: &[],
            provides: &provides,
        };
        let config: serde_yaml::Value = serde_yaml::from_str("values: { ok: true }").unwrap();

        assert!(ValueKind.create(&context, &config).is_err());
    }
}
