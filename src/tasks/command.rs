// ABOUTME: Command task kind running a process or shell script as a flow step
// ABOUTME: Inputs are exported as environment variables; stdout becomes the task outputs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::{KindContext, TaskKind};
use crate::task::{Result, TaskBehavior, TaskError, Values};

pub struct CommandKind;

/// Configuration for command task execution
///
/// Supports two execution modes:
/// 1. Simple command: Use `command` + `args` for single command execution
/// 2. Script mode: Use `script` for a multi-line script run by `shell -c`
///
/// Every input is visible to the process as `FLOWTASK_<NAME>`.
///
/// ## Examples
///
/// ### Simple Command
/// ```yaml
/// kind: command
/// requires: [user]
/// provides: home
/// config:
///   command: sh
///   args: ["-c", "echo /home/$FLOWTASK_USER"]
/// ```
///
/// ### Script with JSON output and a compensating script
/// ```yaml
/// kind: command
/// provides: [dir, created]
/// config:
///   output: json
///   script: |
///     mkdir -p /tmp/staging
///     echo '{"dir": "/tmp/staging", "created": true}'
///   revert_script: rm -rf "$FLOWTASK_RESULT_DIR"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Command to execute (for simple command mode). Mutually exclusive with `script`.
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments for the command (only used with `command`)
    #[serde(default)]
    pub args: Vec<String>,

    /// Script text (for script mode). Mutually exclusive with `command`.
    #[serde(default)]
    pub script: Option<String>,

    /// Shell interpreter used for scripts (default: /bin/bash)
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Environment variables to set during execution
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for command/script execution
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Maximum execution time in seconds (default: 300)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: Option<u64>,

    /// List of exit codes considered successful (default: [0])
    #[serde(default = "default_exit_codes")]
    pub expected_exit_codes: Vec<i32>,

    /// How stdout maps onto the provided names
    #[serde(default)]
    pub output: OutputMode,

    #[serde(default)]
    pub revert_command: Option<String>,

    #[serde(default)]
    pub revert_args: Vec<String>,

    #[serde(default)]
    pub revert_script: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Trimmed stdout under the single provided name
    #[default]
    Text,
    /// Stdout parsed as a JSON object
    Json,
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_timeout() -> Option<u64> {
    Some(300)
}

fn default_exit_codes() -> Vec<i32> {
    vec![0]
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            script: None,
            shell: default_shell(),
            env: HashMap::new(),
            working_dir: None,
            timeout_seconds: default_timeout(),
            expected_exit_codes: default_exit_codes(),
            output: OutputMode::Text,
            revert_command: None,
            revert_args: Vec::new(),
            revert_script: None,
        }
    }
}

/// One process launch: either a program with args or a script.
#[derive(Debug, Clone)]
enum Invocation {
    Program { command: String, args: Vec<String> },
    Script(String),
}

pub struct CommandTask {
    task: String,
    config: CommandConfig,
    forward: Invocation,
    compensation: Option<Invocation>,
    provides: Vec<String>,
}

#[async_trait]
impl TaskBehavior for CommandTask {
    async fn execute(&self, inputs: &Values) -> Result<Values> {
        info!("Executing command task: {}", self.task);
        let env = export_values("FLOWTASK_", inputs);
        let stdout = self.launch(&self.forward, env).await?;
        self.parse_outputs(&stdout)
    }

    async fn revert(&self, result: Option<&Values>, inputs: &Values) -> Result<()> {
        let Some(ref compensation) = self.compensation else {
            return Ok(());
        };

        info!("Reverting command task: {}", self.task);
        let mut env = export_values("FLOWTASK_", inputs);
        if let Some(result) = result {
            env.extend(export_values("FLOWTASK_RESULT_", result));
        }
        self.launch(compensation, env).await.map(|_| ())
    }
}

impl CommandTask {
    /// Run an invocation and return its stdout
    async fn launch(&self, invocation: &Invocation, env: Vec<(String, String)>) -> Result<String> {
        let mut cmd = match invocation {
            Invocation::Program { command, args } => {
                debug!("Command: {} {:?}", command, args);
                let mut cmd = Command::new(command);
                cmd.args(args);
                cmd
            }
            Invocation::Script(script) => {
                debug!("Script ({} chars) via {}", script.len(), self.config.shell);
                let mut cmd = Command::new(&self.config.shell);
                cmd.arg("-c").arg(script);
                cmd
            }
        };

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }
        if let Some(ref working_dir) = self.config.working_dir {
            cmd.current_dir(working_dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.config.timeout_seconds {
            Some(seconds) => timeout(Duration::from_secs(seconds), cmd.output())
                .await
                .map_err(|_| TaskError::Timeout {
                    task: self.task.clone(),
                    seconds,
                })??,
            None => cmd.output().await?,
        };

        let exit_code = output.status.code().unwrap_or(-1);
        debug!("Command completed with exit code: {}", exit_code);

        if !self.config.expected_exit_codes.is_empty()
            && !self.config.expected_exit_codes.contains(&exit_code)
        {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TaskError::failed(format!(
                "Command exited with unexpected code: {} (expected one of: {:?}){}",
                exit_code,
                self.config.expected_exit_codes,
                if stderr.trim().is_empty() {
                    String::new()
                } else {
                    format!(": {}", stderr.trim())
                }
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn parse_outputs(&self, stdout: &str) -> Result<Values> {
        match self.config.output {
            OutputMode::Text => {
                let mut outputs = Values::new();
                if let Some(name) = self.provides.first() {
                    outputs.insert(name.clone(), Value::String(stdout.trim().to_string()));
                }
                Ok(outputs)
            }
            OutputMode::Json => match serde_json::from_str::<Value>(stdout.trim())? {
                Value::Object(map) => Ok(map.into_iter().collect()),
                other => Err(TaskError::failed(format!(
                    "Command output must be a JSON object, got: {}",
                    other
                ))),
            },
        }
    }
}

/// Environment pairs for values, e.g. `user` becomes `FLOWTASK_USER`
fn export_values(prefix: &str, values: &Values) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(name, value)| {
            let key: String = name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect();
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (format!("{}{}", prefix, key), value)
        })
        .collect()
}

fn invocation(
    context: &KindContext<'_>,
    command: Option<String>,
    args: Vec<String>,
    script: Option<String>,
    label: &str,
) -> Result<Option<Invocation>> {
    match (command, script) {
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(context.config_error(format!(
            "Cannot specify both {label}command and {label}script - use only one"
        ))),
        (Some(command), None) if command.trim().is_empty() => {
            Err(context.config_error(format!("{label}command cannot be empty")))
        }
        (Some(command), None) => Ok(Some(Invocation::Program { command, args })),
        (None, Some(script)) if script.trim().is_empty() => {
            Err(context.config_error(format!("{label}script cannot be empty")))
        }
        (None, Some(script)) => Ok(Some(Invocation::Script(script))),
    }
}

impl TaskKind for CommandKind {
    fn kind(&self) -> &'static str {
        "command"
    }

    fn create(
        &self,
        context: &KindContext<'_>,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn TaskBehavior>> {
        let config: CommandConfig = serde_yaml::from_value(config.clone())
            .map_err(|e| context.config_error(format!("Invalid command configuration: {}", e)))?;

        let forward = invocation(
            context,
            config.command.clone(),
            config.args.clone(),
            config.script.clone(),
            "",
        )?
        .ok_or_else(|| context.config_error("Either 'command' or 'script' must be provided"))?;

        let compensation = invocation(
            context,
            config.revert_command.clone(),
            config.revert_args.clone(),
            config.revert_script.clone(),
            "revert_",
        )?;

        if (config.script.is_some() || config.revert_script.is_some())
            && config.shell.trim().is_empty()
        {
            return Err(context.config_error(
                "Shell interpreter cannot be empty when using script mode",
            ));
        }

        if config.timeout_seconds == Some(0) {
            return Err(context.config_error("Timeout must be greater than 0"));
        }

        if config.output == OutputMode::Text && context.provides.len() > 1 {
            return Err(context.config_error(
                "text output fills at most one provided name; use `output: json`",
            ));
        }

        Ok(Arc::new(CommandTask {
            task: context.task.to_string(),
            config,
            forward,
            compensation,
            provides: context.provides.to_vec(),
        }))
    }
}
