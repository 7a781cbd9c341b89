// ABOUTME: Error taxonomy for the workflow execution engine
// ABOUTME: Structural errors are pre-flight and fatal; step errors are recoverable per strategy

use thiserror::Error;

use crate::definition::ValidationError;

/// A step input that could not be materialized from the run context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnresolvedInput {
    #[error("step '{step}' input '{param}': workflow input key '{key}' not found (available keys: {available:?})")]
    MissingWorkflowInput {
        step: String,
        param: String,
        key: String,
        available: Vec<String>,
    },

    #[error("step '{step}' input '{param}': referenced step '{source_step}' has no recorded outputs (not yet completed, or failed)")]
    InvalidStepReference {
        step: String,
        param: String,
        source_step: String,
    },

    #[error("step '{step}' input '{param}': step '{source_step}' produced no output named '{output}' (available outputs: {available:?})")]
    MissingOutput {
        step: String,
        param: String,
        source_step: String,
        output: String,
        available: Vec<String>,
    },
}

/// A workflow that violates the supplied architectural constraints.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    #[error("workflow declares {actual} steps, exceeding the maximum of {limit}")]
    TooManySteps { actual: usize, limit: usize },

    #[error("step '{step}': no metadata found for task '{task}'")]
    TaskNotFound { step: String, task: String },

    #[error("step '{step}': task type '{task_type}' is not in the allowed set {allowed:?}")]
    TypeNotAllowed {
        step: String,
        task_type: String,
        allowed: Vec<String>,
    },

    #[error("step '{step}': task type '{task_type}' is prohibited")]
    TypeProhibited { step: String, task_type: String },

    #[error("step '{step}': task is missing required tag '{tag}'")]
    MissingRequiredTag { step: String, tag: String },

    #[error("step '{step}': task carries prohibited tag '{tag}'")]
    ProhibitedTag { step: String, tag: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Workflow validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    #[error("Input resolution failed: {0}")]
    UnresolvedInput(#[from] UnresolvedInput),

    #[error("step '{step}': task '{task}' is not registered")]
    TaskNotRegistered { step: String, task: String },

    #[error("fallback workflow '{workflow_id}' requested but no sub-workflow runner is configured")]
    FallbackUnavailable { workflow_id: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("Join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Internal orchestration error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
