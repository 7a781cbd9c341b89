// ABOUTME: Workflow execution engine module
// ABOUTME: Graph validation, constraint enforcement, input resolution, and orchestration

pub mod constraints;
pub mod context;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod resolver;
pub mod result;
pub mod scheduler;

pub use constraints::ConstraintValidator;
pub use context::{RunContext, ValueMap, WORKFLOW_INPUTS_KEY};
pub use error::{ConstraintViolation, EngineError, Result, UnresolvedInput};
pub use graph::StepGraph;
pub use orchestrator::{
    EngineConfig, SubWorkflowRunner, WorkflowEngine, DEFAULT_MAX_PARALLEL_STEPS,
};
pub use resolver::resolve_inputs;
pub use result::{RunStatus, RunSummary, StepRunRecord, StepStatus, WorkflowRunResult};
pub use scheduler::RetrySchedule;
