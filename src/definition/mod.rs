// ABOUTME: Definition module for workflow data structures
// ABOUTME: Exports workflow definitions, input sources, constraints, and parsing errors

pub mod constraints;
pub mod error;
pub mod file;
pub mod workflow;

pub use constraints::ArchitecturalConstraints;
pub use error::{DefinitionError, ValidationError};
pub use file::{ScriptTaskSpec, WorkflowFile};
pub use workflow::{ErrorHandlingConfig, ExecutionMode, InputSource, Step, WorkflowDefinition};
