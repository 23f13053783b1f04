// ABOUTME: Configuration management for the flowtask application
// ABOUTME: Handles loading configuration from files and environment overrides

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where task definition units are discovered
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: PathBuf,

    /// Descend into subdirectories of `tasks_dir`
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Initial store values for every run
    #[serde(default)]
    pub params: IndexMap<String, Value>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_tasks_dir() -> PathBuf {
    PathBuf::from("tasks")
}

fn default_recursive() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_dir: default_tasks_dir(),
            recursive: default_recursive(),
            params: IndexMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };

        config.merge_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        // An empty file means defaults
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".flowtask").join("config.yaml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        ["flowtask.yaml", "flowtask.yml", ".flowtask.yaml", ".flowtask.yml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) {
        if let Ok(dir) = std::env::var("FLOWTASK_TASKS_DIR") {
            self.tasks_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("FLOWTASK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FLOWTASK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Merge command line values over the configured params
    pub fn merge_params(&mut self, params: IndexMap<String, Value>) {
        self.params.extend(params);
    }
}
