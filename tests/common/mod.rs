// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builds YAML task units on disk and native tasks that journal their calls

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;

use flowtask::loader::{DeclaredTask, TaskMetadata};
use flowtask::task::{Result as TaskResult, TaskBehavior, TaskError, Values};

pub struct TestUnitBuilder {
    tasks: Vec<TestTask>,
}

pub struct TestTask {
    pub key: String,
    pub flow: String,
    pub priority: Option<i64>,
    pub requires: Vec<String>,
    pub provides: Vec<String>,
    /// Lines under `config:`, already indented relative to it
    pub config: Vec<String>,
    pub kind: String,
}

impl TestUnitBuilder {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn with_task(mut self, task: TestTask) -> Self {
        self.tasks.push(task);
        self
    }

    /// A `value` task providing `name: true`
    pub fn add_flag_task(mut self, key: &str, flow: &str, priority: i64, name: &str) -> Self {
        self.tasks.push(TestTask {
            key: key.to_string(),
            flow: flow.to_string(),
            priority: Some(priority),
            requires: Vec::new(),
            provides: vec![name.to_string()],
            config: vec!["values:".to_string(), format!("  {}: true", name)],
            kind: "value".to_string(),
        });
        self
    }

    pub fn add_template_task(
        mut self,
        key: &str,
        flow: &str,
        priority: i64,
        requires: &[&str],
        provides: &str,
        template: &str,
    ) -> Self {
        self.tasks.push(TestTask {
            key: key.to_string(),
            flow: flow.to_string(),
            priority: Some(priority),
            requires: requires.iter().map(|s| s.to_string()).collect(),
            provides: vec![provides.to_string()],
            config: vec![format!("template: \"{}\"", template), "strict: true".to_string()],
            kind: "template".to_string(),
        });
        self
    }

    /// A `command` task that exits non-zero
    pub fn add_failing_task(mut self, key: &str, flow: &str, priority: i64) -> Self {
        self.tasks.push(TestTask {
            key: key.to_string(),
            flow: flow.to_string(),
            priority: Some(priority),
            requires: Vec::new(),
            provides: Vec::new(),
            config: vec!["command: \"false\"".to_string()],
            kind: "command".to_string(),
        });
        self
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.generate_yaml()).await?;
        Ok(())
    }

    pub fn generate_yaml(&self) -> String {
        let mut yaml = String::from("tasks:\n");
        for task in &self.tasks {
            yaml.push_str(&format!("  {}:\n", task.key));
            yaml.push_str(&format!("    kind: {}\n", task.kind));
            yaml.push_str(&format!("    flow_name: {}\n", task.flow));
            if let Some(priority) = task.priority {
                yaml.push_str(&format!("    priority: {}\n", priority));
            }
            yaml.push_str(&format!("    requires: [{}]\n", task.requires.join(", ")));
            yaml.push_str(&format!("    provides: [{}]\n", task.provides.join(", ")));
            if !task.config.is_empty() {
                yaml.push_str("    config:\n");
                for line in &task.config {
                    yaml.push_str(&format!("      {}\n", line));
                }
            }
        }
        yaml
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.path().join("tasks")
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    /// Write a unit under the tasks directory, creating it if needed
    pub async fn create_unit(&self, relative: &str, builder: &TestUnitBuilder) -> PathBuf {
        self.write_unit(relative, &builder.generate_yaml()).await
    }

    pub async fn write_unit(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.tasks_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .expect("Failed to create tasks directory");
        }
        fs::write(&path, content)
            .await
            .expect("Failed to write task unit");
        path
    }
}

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Native task that records `execute:<name>` / `revert:<name>:<some|none>` calls
pub struct RecordingTask {
    pub metadata: TaskMetadata,
    pub outputs: Values,
    pub fail: bool,
    pub journal: Journal,
}

impl RecordingTask {
    pub fn new(journal: &Journal, name: &str, flow: &str, priority: i64) -> Self {
        Self {
            metadata: TaskMetadata::new(name).flow_name(flow).priority(priority),
            outputs: Values::new(),
            fail: false,
            journal: journal.clone(),
        }
    }

    pub fn provides(mut self, name: &str, value: Value) -> Self {
        self.metadata.provides.push(name.to_string());
        self.outputs.insert(name.to_string(), value);
        self
    }

    pub fn requires(mut self, name: &str) -> Self {
        self.metadata.requires.push(name.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl DeclaredTask for RecordingTask {
    fn metadata(&self) -> TaskMetadata {
        self.metadata.clone()
    }
}

#[async_trait]
impl TaskBehavior for RecordingTask {
    async fn execute(&self, _inputs: &Values) -> TaskResult<Values> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("execute:{}", self.metadata.name));
        if self.fail {
            return Err(TaskError::failed(format!("{} failed", self.metadata.name)));
        }
        Ok(self.outputs.clone())
    }

    async fn revert(&self, result: Option<&Values>, _inputs: &Values) -> TaskResult<()> {
        self.journal.lock().unwrap().push(format!(
            "revert:{}:{}",
            self.metadata.name,
            if result.is_some() { "some" } else { "none" }
        ));
        Ok(())
    }
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}
