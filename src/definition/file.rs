// ABOUTME: Self-contained workflow file format bundling a definition with script tasks
// ABOUTME: Lets a single YAML file declare both the step graph and the tasks it references

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::error::{DefinitionError, Result};
use super::workflow::WorkflowDefinition;

fn default_interpreter() -> String {
    "/bin/bash".to_string()
}

/// A runnable workflow file: the definition plus declarations for the
/// script tasks its steps reference. Tasks registered programmatically
/// (model calls, notebooks) don't appear here; the `tasks` section only
/// covers the interpreter-backed kind a file can describe on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFile {
    #[serde(flatten)]
    pub workflow: WorkflowDefinition,
    #[serde(default)]
    pub tasks: IndexMap<String, ScriptTaskSpec>,
}

/// Declaration of one script task: an interpreter and a script body,
/// executed through the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptTaskSpec {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    pub script: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
}

impl WorkflowFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DefinitionError::IoError)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: WorkflowFile = serde_yaml::from_str(content).map_err(DefinitionError::YamlError)?;
        file.workflow.validate_structure()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workflow_file_with_tasks() {
        let yaml = r#"
id: wf-file
name: file workflow

tasks:
  shout:
    interpreter: /bin/bash
    script: |
      echo "{\"text\": \"LOUD\"}"
    tags: [shell]
    timeout: 30s

steps:
  - id: first
    task: shout
"#;

        let file = WorkflowFile::from_yaml(yaml).unwrap();
        assert_eq!(file.workflow.id, "wf-file");
        let spec = file.tasks.get("shout").unwrap();
        assert_eq!(spec.interpreter, "/bin/bash");
        assert_eq!(spec.tags, vec!["shell"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_tasks_section_optional() {
        let yaml = r#"
id: wf-plain
name: plain workflow
steps:
  - id: only
    task: registered-elsewhere
"#;

        let file = WorkflowFile::from_yaml(yaml).unwrap();
        assert!(file.tasks.is_empty());
    }
}
