// ABOUTME: Template task kind rendering a Handlebars template against task inputs
// ABOUTME: Stores the rendered text under the task's single provided name

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{KindContext, TaskKind};
use crate::task::{Result, TaskBehavior, Values};

pub struct TemplateKind;

/// ```yaml
/// kind: template
/// requires: [user]
/// provides: greeting
/// config:
///   template: "Welcome, {{user}}!"
///   strict: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub template: String,

    /// Fail on references to names that are not inputs
    #[serde(default)]
    pub strict: bool,
}

pub struct TemplateTask {
    handlebars: Handlebars<'static>,
    template: String,
    output: String,
}

impl TemplateTask {
    pub fn new(template: String, output: String, strict: bool) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(strict);
        // Rendered values feed other tasks and commands, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            handlebars,
            template,
            output,
        }
    }
}

#[async_trait]
impl TaskBehavior for TemplateTask {
    async fn execute(&self, inputs: &Values) -> Result<Values> {
        let rendered = self.handlebars.render_template(&self.template, inputs)?;

        let mut outputs = Values::new();
        outputs.insert(self.output.clone(), Value::String(rendered));
        Ok(outputs)
    }
}

impl TaskKind for TemplateKind {
    fn kind(&self) -> &'static str {
        "template"
    }

    fn create(
        &self,
        context: &KindContext<'_>,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn TaskBehavior>> {
        let config: TemplateConfig = serde_yaml::from_value(config.clone())
            .map_err(|e| context.config_error(format!("Invalid template configuration: {}", e)))?;

        if config.template.is_empty() {
            return Err(context.config_error("Template cannot be empty"));
        }

        let output = context.single_output("template")?;
        Ok(Arc::new(TemplateTask::new(
            config.template,
            output,
            config.strict,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_renders_inputs_without_escaping() {
        let task = TemplateTask::new(
            "Welcome, {{user}} <{{email}}>".to_string(),
            "greeting".to_string(),
            false,
        );
        let mut inputs = Values::new();
        inputs.insert("user".to_string(), json!("Ada"));
        inputs.insert("email".to_string(), json!("ada@example.com"));

        let outputs = task.execute(&inputs).await.unwrap();
        assert_eq!(
            outputs["greeting"],
            json!("Welcome, Ada <ada@example.com>")
        );
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unknown_names() {
        let task = TemplateTask::new("{{missing}}".to_string(), "out".to_string(), true);
        assert!(task.execute(&Values::new()).await.is_err());
    }

    #[test]
    fn test_create_requires_single_output() {
        let provides: Vec<String> = Vec::new();
        let context = KindContext {
            task: "greet",
            requires: &[],
            provides: &provides,
        };
        let config: serde_yaml::Value = serde_yaml::from_str("template: hi").unwrap();
        assert!(TemplateKind.create(&context, &config).is_err());
    }
}
