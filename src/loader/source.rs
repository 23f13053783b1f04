// ABOUTME: Task sources the unit loader reads candidates from
// ABOUTME: YAML units parsed from text or disk, and native units of compiled-in tasks

use std::path::Path;
use std::sync::Arc;

use super::definition::{DeclaredTask, TaskMetadata};
use super::error::{LoaderError, Result};
use crate::task::TaskBehavior;

/// Something a source yields for the loader to qualify.
#[derive(Clone)]
pub enum Candidate {
    /// Raw YAML definition, deserialized by the loader so shape errors stay per-definition
    Yaml(serde_yaml::Value),
    Native {
        metadata: TaskMetadata,
        behavior: Arc<dyn TaskBehavior>,
    },
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Candidate::Yaml(value) => f.debug_tuple("Yaml").field(value).finish(),
            Candidate::Native { metadata, .. } => f
                .debug_struct("Native")
                .field("metadata", metadata)
                .finish_non_exhaustive(),
        }
    }
}

/// A finite, ordered collection of named task candidates.
pub trait TaskSource {
    /// Unit name used in reports and to detect double loading
    fn name(&self) -> &str;

    /// Candidates in declaration order. `MalformedUnit` when the unit cannot be read as a whole.
    fn candidates(&self) -> Result<Vec<(String, Candidate)>>;
}

#[derive(Debug, Clone)]
pub struct YamlUnit {
    name: String,
    content: String,
}

impl YamlUnit {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            // Undecodable content is a problem with this unit, not the location
            if source.kind() == std::io::ErrorKind::InvalidData {
                LoaderError::MalformedUnit {
                    unit: path.display().to_string(),
                    reason: source.to_string(),
                }
            } else {
                LoaderError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(Self::from_yaml(path.display().to_string(), content))
    }

    pub fn from_yaml(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> LoaderError {
        LoaderError::MalformedUnit {
            unit: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl TaskSource for YamlUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self) -> Result<Vec<(String, Candidate)>> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(&self.content).map_err(|e| self.malformed(e.to_string()))?;

        // An empty file declares nothing
        let document = match document {
            serde_yaml::Value::Null => return Ok(Vec::new()),
            serde_yaml::Value::Mapping(map) => map,
            _ => return Err(self.malformed("expected a mapping with a 'tasks' key")),
        };

        let tasks = match document.get("tasks") {
            None | Some(serde_yaml::Value::Null) => return Ok(Vec::new()),
            Some(serde_yaml::Value::Mapping(tasks)) => tasks,
            Some(_) => return Err(self.malformed("'tasks' must be a mapping of definitions")),
        };

        tasks
            .iter()
            .map(|(key, value)| match key.as_str() {
                Some(key) => Ok((key.to_string(), Candidate::Yaml(value.clone()))),
                None => Err(self.malformed(format!("task keys must be strings, got {:?}", key))),
            })
            .collect()
    }
}

/// Compiled-in tasks grouped under one unit name.
#[derive(Debug, Clone, Default)]
pub struct NativeUnit {
    name: String,
    candidates: Vec<(String, Candidate)>,
}

impl NativeUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_task<T>(mut self, task: T) -> Self
    where
        T: DeclaredTask + TaskBehavior + 'static,
    {
        let metadata = task.metadata();
        let behavior: Arc<dyn TaskBehavior> = Arc::new(task);
        self.candidates
            .push((metadata.name.clone(), Candidate::Native { metadata, behavior }));
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl TaskSource for NativeUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self) -> Result<Vec<(String, Candidate)>> {
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_candidates_keep_declaration_order() {
        let unit = YamlUnit::from_yaml(
            "unit.yaml",
            "tasks:\n  zeta: { kind: value }\n  alpha: { kind: value }\n",
        );
        let names: Vec<String> = unit
            .candidates()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_empty_unit_has_no_candidates() {
        assert!(YamlUnit::from_yaml("empty.yaml", "").candidates().unwrap().is_empty());
        assert!(YamlUnit::from_yaml("bare.yaml", "tasks:").candidates().unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_unit_is_malformed() {
        for content in ["tasks: [unclosed", "- a\n- b", "tasks: [a, b]"] {
            let result = YamlUnit::from_yaml("bad.yaml", content).candidates();
            assert!(
                matches!(result, Err(LoaderError::MalformedUnit { .. })),
                "content {:?}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = YamlUnit::from_path(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(LoaderError::Io { .. })));
    }

    #[test]
    fn test_undecodable_file_is_malformed_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.yaml");
        std::fs::write(&path, b"caf\xe9").unwrap();

        let error = YamlUnit::from_path(&path).unwrap_err();
        assert!(matches!(error, LoaderError::MalformedUnit { .. }));
        assert!(!error.is_fatal());
    }
}
