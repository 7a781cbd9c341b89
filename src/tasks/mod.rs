// ABOUTME: Task capability interface and the explicit task registry store
// ABOUTME: The engine depends only on the execute(inputs) contract, never on task internals

pub mod script;

pub use script::ScriptTask;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::context::ValueMap;

/// The contract every task kind must satisfy. A task receives its resolved
/// inputs and reports success with an output map, or failure with an error
/// string. The orchestrator never looks past this shape.
#[async_trait]
pub trait TaskCapability: Send + Sync {
    async fn execute(&self, inputs: ValueMap) -> TaskExecution;
}

/// Outcome of one task execution attempt.
#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub success: bool,
    pub result: Option<ValueMap>,
    pub error: Option<String>,
}

impl TaskExecution {
    pub fn ok(outputs: ValueMap) -> Self {
        Self {
            success: true,
            result: Some(outputs),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Descriptive metadata the constraint validator checks tasks against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Lookup interface consumed by the constraint validator.
pub trait TaskMetadataLookup: Send + Sync {
    fn lookup(&self, task_id: &str) -> Option<TaskMetadata>;
}

struct RegisteredTask {
    version: Option<String>,
    metadata: TaskMetadata,
    capability: Arc<dyn TaskCapability>,
}

/// Explicit store of registered tasks, created once and passed into the
/// engine and validator constructors. Never a module-level global.
pub struct TaskRegistry {
    tasks: HashMap<String, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        task_id: impl Into<String>,
        version: Option<String>,
        metadata: TaskMetadata,
        capability: Arc<dyn TaskCapability>,
    ) {
        self.tasks.insert(
            task_id.into(),
            RegisteredTask {
                version,
                metadata,
                capability,
            },
        );
    }

    /// The capability registered for a task id, honoring an optional
    /// version pin: a pinned request only matches the registered version.
    pub fn capability(
        &self,
        task_id: &str,
        version: Option<&str>,
    ) -> Option<Arc<dyn TaskCapability>> {
        let registered = self.tasks.get(task_id)?;
        if let Some(requested) = version {
            if registered.version.as_deref() != Some(requested) {
                return None;
            }
        }
        Some(Arc::clone(&registered.capability))
    }

    pub fn metadata(&self, task_id: &str) -> Option<&TaskMetadata> {
        self.tasks.get(task_id).map(|t| &t.metadata)
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskMetadataLookup for TaskRegistry {
    fn lookup(&self, task_id: &str) -> Option<TaskMetadata> {
        self.metadata(task_id).cloned()
    }
}
