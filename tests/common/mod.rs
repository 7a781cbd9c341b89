// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides a workflow builder and a registry of deterministic test tasks

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use switchyard::engine::ValueMap;
use switchyard::tasks::{TaskCapability, TaskExecution, TaskMetadata, TaskRegistry};
use switchyard::{ErrorHandlingConfig, ExecutionMode, InputSource, Step, WorkflowDefinition};

pub struct TestWorkflowBuilder {
    id: String,
    name: String,
    mode: ExecutionMode,
    on_error: ErrorHandlingConfig,
    steps: Vec<Step>,
}

impl TestWorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            id: format!("wf-{name}"),
            name: name.to_string(),
            mode: ExecutionMode::Sequential,
            on_error: ErrorHandlingConfig::StopOnError,
            steps: Vec::new(),
        }
    }

    pub fn parallel(mut self) -> Self {
        self.mode = ExecutionMode::Parallel;
        self
    }

    pub fn on_error(mut self, strategy: ErrorHandlingConfig) -> Self {
        self.on_error = strategy;
        self
    }

    pub fn add_step(self, id: &str, task: &str, depends_on: &[&str]) -> Self {
        self.add_step_with_inputs(id, task, depends_on, vec![])
    }

    pub fn add_step_with_inputs(
        mut self,
        id: &str,
        task: &str,
        depends_on: &[&str],
        inputs: Vec<(&str, InputSource)>,
    ) -> Self {
        self.steps.push(Step {
            id: id.to_string(),
            name: None,
            task: task.to_string(),
            task_version: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            inputs: inputs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<IndexMap<_, _>>(),
        });
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id,
            name: self.name,
            description: None,
            mode: self.mode,
            on_error: self.on_error,
            steps: self.steps,
        }
    }
}

pub fn static_value(value: serde_json::Value) -> InputSource {
    InputSource::Static { value }
}

pub fn from_workflow_input(key: &str) -> InputSource {
    InputSource::WorkflowInput {
        key: key.to_string(),
    }
}

pub fn from_step_output(step: &str, output: &str) -> InputSource {
    InputSource::StepOutput {
        step: step.to_string(),
        output: output.to_string(),
    }
}

/// Emits `{"out": <input "text">}`.
struct EmitTask;

#[async_trait]
impl TaskCapability for EmitTask {
    async fn execute(&self, inputs: ValueMap) -> TaskExecution {
        let mut outputs = ValueMap::new();
        outputs.insert(
            "out".to_string(),
            inputs.get("text").cloned().unwrap_or(json!(null)),
        );
        TaskExecution::ok(outputs)
    }
}

/// Emits `{"out": <all string inputs concatenated in order>}`.
struct ConcatTask;

#[async_trait]
impl TaskCapability for ConcatTask {
    async fn execute(&self, inputs: ValueMap) -> TaskExecution {
        let joined: String = inputs
            .values()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect();
        let mut outputs = ValueMap::new();
        outputs.insert("out".to_string(), json!(joined));
        TaskExecution::ok(outputs)
    }
}

/// Always fails with a fixed message.
struct FailTask;

#[async_trait]
impl TaskCapability for FailTask {
    async fn execute(&self, _inputs: ValueMap) -> TaskExecution {
        TaskExecution::fail("deliberate test failure")
    }
}

/// Sleeps for the `millis` input (default 100), then emits `{"out": "done"}`.
struct SleeperTask;

#[async_trait]
impl TaskCapability for SleeperTask {
    async fn execute(&self, inputs: ValueMap) -> TaskExecution {
        let millis = inputs
            .get("millis")
            .and_then(|v| v.as_u64())
            .unwrap_or(100);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        let mut outputs = ValueMap::new();
        outputs.insert("out".to_string(), json!("done"));
        TaskExecution::ok(outputs)
    }
}

/// Fails the first `failures` attempts, then succeeds.
pub struct FlakyTask {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyTask {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TaskCapability for FlakyTask {
    async fn execute(&self, _inputs: ValueMap) -> TaskExecution {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            TaskExecution::fail(format!("flaky attempt {call}"))
        } else {
            let mut outputs = ValueMap::new();
            outputs.insert("out".to_string(), json!("recovered"));
            TaskExecution::ok(outputs)
        }
    }
}

fn script_metadata(tags: &[&str]) -> TaskMetadata {
    TaskMetadata {
        task_type: "script".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Registry with the deterministic task set the engine tests use.
pub fn test_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register("emit", None, script_metadata(&["local"]), Arc::new(EmitTask));
    registry.register(
        "concat",
        None,
        script_metadata(&["local"]),
        Arc::new(ConcatTask),
    );
    registry.register("fail", None, script_metadata(&["local"]), Arc::new(FailTask));
    registry.register(
        "sleeper",
        None,
        script_metadata(&["local", "slow"]),
        Arc::new(SleeperTask),
    );
    registry
}
