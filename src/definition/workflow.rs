// ABOUTME: Core workflow definition data structures and parsing functionality
// ABOUTME: Defines WorkflowDefinition, Step, InputSource, and execution policy types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::error::{DefinitionError, Result, ValidationError};

/// An immutable workflow definition: an ordered list of steps plus the
/// execution mode and error-handling policy the run should use. The engine
/// treats this as a value; loading and versioning belong to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub on_error: ErrorHandlingConfig,
    pub steps: Vec<Step>,
}

/// One node in the workflow graph, wrapping a task invocation.
///
/// `id` is unique within the workflow and stable across edits; `task`
/// references a task registered in the [`TaskRegistry`](crate::tasks::TaskRegistry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: Option<String>,
    pub task: String,
    pub task_version: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, InputSource>,
}

/// Where a step input value comes from.
///
/// Modeled as a true sum type so that illegal field combinations are
/// unrepresentable: a `step_output` source always carries both the source
/// step id and the output name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InputSource {
    /// A literal value, resolved immediately.
    Static { value: serde_json::Value },
    /// Pulled from the input map supplied when the run starts.
    WorkflowInput { key: String },
    /// Pulled from a prior step's output map.
    StepOutput { step: String, output: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Per-workflow failure policy, applied when a step fails terminally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ErrorHandlingConfig {
    /// First step failure halts new dispatch; in-flight steps finish.
    #[default]
    StopOnError,
    /// Re-attempt a failed step before the failure counts as terminal.
    RetryWithBackoff {
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        #[serde(default = "default_backoff_factor")]
        backoff_factor: f64,
    },
    /// On terminal failure, run a designated fallback workflow with the
    /// same initial inputs; the outer run mirrors the fallback's status.
    FallbackChain { fallback_workflow: String },
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl WorkflowDefinition {
    /// Parse a workflow definition from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DefinitionError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse a workflow definition from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let workflow: WorkflowDefinition =
            serde_yaml::from_str(content).map_err(DefinitionError::YamlError)?;
        workflow.validate_structure()?;
        Ok(workflow)
    }

    /// Validate basic structure: ids present, unique, input sources well formed.
    ///
    /// Dependency existence and acyclicity are proven later by the graph
    /// builder; this check catches everything that is wrong about a single
    /// step in isolation.
    pub fn validate_structure(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::MissingField("id".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(DefinitionError::MissingField("name".to_string()));
        }
        if self.steps.is_empty() {
            return Err(ValidationError::EmptyWorkflow.into());
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(DefinitionError::MissingField("step.id".to_string()));
            }
            if !seen.insert(step.id.clone()) {
                return Err(ValidationError::DuplicateStep {
                    step: step.id.clone(),
                }
                .into());
            }
            for (param, source) in &step.inputs {
                source.validate().map_err(|reason| {
                    ValidationError::InvalidInputSource {
                        step: step.id.clone(),
                        param: param.clone(),
                        reason,
                    }
                })?;
            }
        }

        Ok(())
    }

    /// All step ids in declaration order.
    pub fn step_ids(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    pub fn get_step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn has_step(&self, step_id: &str) -> bool {
        self.steps.iter().any(|s| s.id == step_id)
    }

    /// Serialize the definition back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DefinitionError::YamlError)
    }
}

impl Step {
    /// The display name, falling back to the step id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Step ids this step reads from, via `depends_on` or `step_output`
    /// input sources.
    pub fn referenced_steps(&self) -> HashSet<&str> {
        let mut refs: HashSet<&str> = self.depends_on.iter().map(String::as_str).collect();
        for source in self.inputs.values() {
            if let InputSource::StepOutput { step, .. } = source {
                refs.insert(step.as_str());
            }
        }
        refs
    }
}

impl InputSource {
    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            InputSource::Static { .. } => Ok(()),
            InputSource::WorkflowInput { key } => {
                if key.trim().is_empty() {
                    Err("workflow_input source requires a non-empty key".to_string())
                } else {
                    Ok(())
                }
            }
            InputSource::StepOutput { step, output } => {
                if step.trim().is_empty() {
                    Err("step_output source requires a non-empty step id".to_string())
                } else if output.trim().is_empty() {
                    Err("step_output source requires a non-empty output name".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl ErrorHandlingConfig {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            ErrorHandlingConfig::StopOnError => "stop_on_error",
            ErrorHandlingConfig::RetryWithBackoff { .. } => "retry_with_backoff",
            ErrorHandlingConfig::FallbackChain { .. } => "fallback_chain",
        }
    }
}
