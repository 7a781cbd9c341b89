// ABOUTME: Main library module for the switchyard workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod definition;
pub mod engine;
pub mod sandbox;
pub mod tasks;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use definition::{
    ArchitecturalConstraints, ErrorHandlingConfig, ExecutionMode, InputSource, Step,
    WorkflowDefinition, WorkflowFile,
};
pub use engine::{
    EngineConfig, RunContext, RunStatus, StepGraph, StepRunRecord, StepStatus, SubWorkflowRunner,
    ValueMap, WorkflowEngine, WorkflowRunResult,
};
pub use sandbox::{Sandbox, SandboxLimits, SandboxOutput};
pub use tasks::{TaskCapability, TaskExecution, TaskMetadata, TaskMetadataLookup, TaskRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
