// ABOUTME: Error types for workflow definition parsing and structural validation
// ABOUTME: Defines specific error types for definition module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Cycle detected in step dependencies: {steps:?}")]
    CycleDetected { steps: Vec<String> },

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Step '{step}' depends on itself")]
    SelfDependency { step: String },

    #[error("Duplicate step id: {step}")]
    DuplicateStep { step: String },

    #[error("Empty workflow: no steps defined")]
    EmptyWorkflow,

    #[error("Step '{step}' input '{param}': {reason}")]
    InvalidInputSource {
        step: String,
        param: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
