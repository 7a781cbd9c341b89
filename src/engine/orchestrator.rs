// ABOUTME: Workflow engine driving runs to completion under the declared policy
// ABOUTME: One coordinating loop owns all run bookkeeping; workers only execute and report

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::definition::{
    ArchitecturalConstraints, ErrorHandlingConfig, ExecutionMode, WorkflowDefinition,
};
use crate::tasks::{TaskExecution, TaskRegistry};

use super::constraints::ConstraintValidator;
use super::context::{RunContext, ValueMap};
use super::error::{EngineError, Result};
use super::graph::StepGraph;
use super::resolver::resolve_inputs;
use super::result::{RunStatus, StepRunRecord, StepStatus, WorkflowRunResult};
use super::scheduler::{execute_with_retry, RetrySchedule};

/// Default ceiling on concurrently running steps in parallel mode.
pub const DEFAULT_MAX_PARALLEL_STEPS: usize = 4;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_parallel_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_steps: DEFAULT_MAX_PARALLEL_STEPS,
        }
    }
}

/// Interface for running a designated fallback workflow. Consumed only by
/// the `fallback_chain` error strategy.
#[async_trait]
pub trait SubWorkflowRunner: Send + Sync {
    async fn run_workflow(&self, workflow_id: &str, inputs: ValueMap) -> WorkflowRunResult;
}

/// Drives one workflow definition to a terminal [`WorkflowRunResult`].
///
/// The registry and policy are injected at construction; the engine holds
/// no global state and one engine value can drive many runs.
pub struct WorkflowEngine {
    registry: Arc<TaskRegistry>,
    config: EngineConfig,
    constraints: Option<ArchitecturalConstraints>,
    sub_workflow_runner: Option<Arc<dyn SubWorkflowRunner>>,
}

/// What the drive loop produced: the per-step records in declaration
/// order, plus how the run ended.
struct DriveOutcome {
    records: IndexMap<String, StepRunRecord>,
    failure: Option<String>,
    cancelled: bool,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            constraints: None,
            sub_workflow_runner: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_parallel(mut self, ceiling: usize) -> Self {
        self.config.max_parallel_steps = ceiling.max(1);
        self
    }

    pub fn with_constraints(mut self, constraints: ArchitecturalConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_sub_workflow_runner(mut self, runner: Arc<dyn SubWorkflowRunner>) -> Self {
        self.sub_workflow_runner = Some(runner);
        self
    }

    /// Structural and constraint validation without executing anything.
    /// Returns the validated graph, which callers can use for diagnostics.
    pub fn validate(&self, workflow: &WorkflowDefinition) -> Result<StepGraph> {
        let graph = StepGraph::build(workflow).map_err(EngineError::Validation)?;
        if let Some(constraints) = &self.constraints {
            ConstraintValidator::validate(workflow, constraints, self.registry.as_ref())?;
        }
        Ok(graph)
    }

    /// Execute a workflow to completion. Always returns a terminal
    /// [`WorkflowRunResult`]; failures are reported in it, never raised.
    pub async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        inputs: ValueMap,
    ) -> WorkflowRunResult {
        self.execute_cancellable(workflow, inputs, CancellationToken::new())
            .await
    }

    /// Execute with an externally owned cancellation token. Cancellation
    /// stops new dispatch immediately; in-flight steps settle before the
    /// run is marked cancelled.
    #[instrument(skip_all, fields(workflow_id = %workflow.id, workflow = %workflow.name))]
    pub async fn execute_cancellable(
        &self,
        workflow: &WorkflowDefinition,
        inputs: ValueMap,
        cancel: CancellationToken,
    ) -> WorkflowRunResult {
        let run_id = Uuid::new_v4().to_string();
        let mut result = WorkflowRunResult::new(run_id.clone(), workflow.id.clone());

        info!(run_id, mode = ?workflow.mode, "starting workflow run");

        // Pre-flight: graph structure, then constraint policy. A failure
        // here produces a Failed result with zero step records.
        let graph = match self.validate(workflow) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(run_id, error = %err, "pre-flight validation failed");
                result.mark_completed(RunStatus::Failed, Some(err.to_string()));
                return result;
            }
        };

        result.mark_running();
        let context = RunContext::new(inputs.clone());

        let outcome = match workflow.mode {
            ExecutionMode::Sequential => self.drive_sequential(workflow, context, &cancel).await,
            ExecutionMode::Parallel => {
                self.drive_parallel(workflow, &graph, context, &cancel).await
            }
        };

        match outcome {
            Ok(drive) => {
                result.step_results = drive.records.into_values().collect();

                if drive.cancelled {
                    info!(run_id, "run cancelled");
                    result.mark_completed(RunStatus::Cancelled, drive.failure);
                } else if let Some(failure) = drive.failure {
                    if let ErrorHandlingConfig::FallbackChain { fallback_workflow } =
                        &workflow.on_error
                    {
                        let fallback_workflow = fallback_workflow.clone();
                        return self
                            .run_fallback(&fallback_workflow, inputs, result, failure)
                            .await;
                    }
                    result.mark_completed(RunStatus::Failed, Some(failure));
                } else {
                    result.final_outputs = final_outputs(workflow, &result.step_results);
                    result.mark_completed(RunStatus::Success, None);
                }
            }
            Err(internal) => {
                // Full detail goes to the log; callers only see a
                // sanitized message.
                error!(run_id, error = %internal, "internal orchestration error");
                result.mark_completed(
                    RunStatus::Failed,
                    Some("internal orchestration error".to_string()),
                );
            }
        }

        info!(run_id, status = %result.status, "workflow run finished");
        result
    }

    /// Declaration-order execution with no concurrency.
    async fn drive_sequential(
        &self,
        workflow: &WorkflowDefinition,
        mut context: RunContext,
        cancel: &CancellationToken,
    ) -> Result<DriveOutcome> {
        let mut records = pending_records(workflow);
        let schedule = RetrySchedule::from_strategy(&workflow.on_error);
        let mut failure: Option<String> = None;
        let mut cancelled = false;

        for step in &workflow.steps {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if failure.is_some() {
                break;
            }

            if let Some(dep) = step
                .depends_on
                .iter()
                .find(|dep| records[*dep].status != StepStatus::Success)
            {
                let reason = format!("dependency '{dep}' did not succeed");
                records.get_mut(&step.id).expect("record exists").mark_skipped(reason);
                continue;
            }

            let resolved = match resolve_inputs(step, &context) {
                Ok(resolved) => resolved,
                Err(err) => {
                    let message = err.to_string();
                    records
                        .get_mut(&step.id)
                        .expect("record exists")
                        .mark_failed(message.clone());
                    failure = Some(format!("step '{}' failed: {message}", step.id));
                    continue;
                }
            };

            let Some(capability) = self
                .registry
                .capability(&step.task, step.task_version.as_deref())
            else {
                let message = format!("task '{}' is not registered", step.task);
                records
                    .get_mut(&step.id)
                    .expect("record exists")
                    .mark_failed(message.clone());
                failure = Some(format!("step '{}' failed: {message}", step.id));
                continue;
            };

            records
                .get_mut(&step.id)
                .expect("record exists")
                .mark_running(resolved.clone());
            debug!(step_id = %step.id, "executing step");

            let (outcome, retries) =
                execute_with_retry(&step.id, capability, resolved, schedule).await;
            record_outcome(
                &mut records,
                &mut context,
                &mut failure,
                &step.id,
                outcome,
                retries,
            );
        }

        skip_remaining(workflow, &mut records, cancelled);
        Ok(DriveOutcome {
            records,
            failure,
            cancelled,
        })
    }

    /// Live-readiness execution: this loop is the only owner of the run
    /// bookkeeping; spawned workers execute one step and report back
    /// through the join set.
    async fn drive_parallel(
        &self,
        workflow: &WorkflowDefinition,
        _graph: &StepGraph,
        mut context: RunContext,
        cancel: &CancellationToken,
    ) -> Result<DriveOutcome> {
        let mut records = pending_records(workflow);
        let schedule = RetrySchedule::from_strategy(&workflow.on_error);
        let ceiling = self.config.max_parallel_steps.max(1);
        let mut join_set: JoinSet<(String, TaskExecution, u32)> = JoinSet::new();
        let mut failure: Option<String> = None;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() && !cancelled {
                cancelled = true;
                info!("cancellation requested; halting new dispatch");
            }

            propagate_skips(workflow, &mut records);

            if failure.is_none() && !cancelled {
                for step in &workflow.steps {
                    if join_set.len() >= ceiling {
                        break;
                    }
                    if records[&step.id].status != StepStatus::Pending {
                        continue;
                    }
                    let ready = step
                        .depends_on
                        .iter()
                        .all(|dep| records[dep].status == StepStatus::Success);
                    if !ready {
                        continue;
                    }

                    // Resolution happens here, immediately before dispatch,
                    // against the freshest context.
                    let resolved = match resolve_inputs(step, &context) {
                        Ok(resolved) => resolved,
                        Err(err) => {
                            let message = err.to_string();
                            records
                                .get_mut(&step.id)
                                .expect("record exists")
                                .mark_failed(message.clone());
                            failure = Some(format!("step '{}' failed: {message}", step.id));
                            break;
                        }
                    };

                    let Some(capability) = self
                        .registry
                        .capability(&step.task, step.task_version.as_deref())
                    else {
                        let message = format!("task '{}' is not registered", step.task);
                        records
                            .get_mut(&step.id)
                            .expect("record exists")
                            .mark_failed(message.clone());
                        failure = Some(format!("step '{}' failed: {message}", step.id));
                        break;
                    };

                    records
                        .get_mut(&step.id)
                        .expect("record exists")
                        .mark_running(resolved.clone());
                    debug!(step_id = %step.id, running = join_set.len() + 1, "dispatching step");

                    let step_id = step.id.clone();
                    join_set.spawn(async move {
                        let (outcome, retries) =
                            execute_with_retry(&step_id, capability, resolved, schedule).await;
                        (step_id, outcome, retries)
                    });
                }
            }

            if join_set.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = join_set.join_next() => joined,
                _ = cancel.cancelled(), if !cancelled => continue,
            };

            match joined {
                Some(Ok((step_id, outcome, retries))) => {
                    record_outcome(
                        &mut records,
                        &mut context,
                        &mut failure,
                        &step_id,
                        outcome,
                        retries,
                    );
                }
                Some(Err(join_error)) => {
                    return Err(EngineError::JoinError(join_error));
                }
                None => {}
            }
        }

        skip_remaining(workflow, &mut records, cancelled);
        Ok(DriveOutcome {
            records,
            failure,
            cancelled,
        })
    }

    /// Run the designated fallback workflow with the outer run's initial
    /// inputs. The outer run mirrors the fallback's status and retains
    /// both step logs.
    async fn run_fallback(
        &self,
        fallback_id: &str,
        inputs: ValueMap,
        mut result: WorkflowRunResult,
        failure: String,
    ) -> WorkflowRunResult {
        let Some(runner) = &self.sub_workflow_runner else {
            let err = EngineError::FallbackUnavailable {
                workflow_id: fallback_id.to_string(),
            };
            warn!(fallback_id, "fallback requested but unavailable");
            result.mark_completed(RunStatus::Failed, Some(format!("{failure}; {err}")));
            return result;
        };

        warn!(fallback_id, trigger = %failure, "triggering fallback workflow");
        let fallback = runner.run_workflow(fallback_id, inputs).await;

        result.step_results.extend(fallback.step_results);
        result.final_outputs = fallback.final_outputs;

        let error_message = match fallback.status {
            RunStatus::Success => None,
            _ => Some(
                fallback
                    .error_message
                    .unwrap_or_else(|| format!("fallback workflow '{fallback_id}' failed")),
            ),
        };
        result.mark_completed(fallback.status, error_message);
        result
    }
}

fn pending_records(workflow: &WorkflowDefinition) -> IndexMap<String, StepRunRecord> {
    workflow
        .steps
        .iter()
        .map(|step| (step.id.clone(), StepRunRecord::new(step.id.clone())))
        .collect()
}

/// Fold one settled step back into the bookkeeping. Success merges the
/// outputs into the context under the step's id; failure arms the halt.
fn record_outcome(
    records: &mut IndexMap<String, StepRunRecord>,
    context: &mut RunContext,
    failure: &mut Option<String>,
    step_id: &str,
    outcome: TaskExecution,
    retries: u32,
) {
    let record = records.get_mut(step_id).expect("record exists");
    record.retry_count = retries;

    if outcome.success {
        let outputs = outcome.result.unwrap_or_default();
        record.mark_success(outputs.clone());
        context.record_outputs(step_id.to_string(), outputs);
        info!(step_id, retries, "step succeeded");
    } else {
        let message = outcome
            .error
            .unwrap_or_else(|| "task reported failure without detail".to_string());
        record.mark_failed(message.clone());
        error!(step_id, retries, error = %message, "step failed");
        if failure.is_none() {
            *failure = Some(format!("step '{step_id}' failed: {message}"));
        }
    }
}

/// Mark pending steps whose dependencies terminally failed or were
/// skipped, cascading until a fixpoint.
fn propagate_skips(workflow: &WorkflowDefinition, records: &mut IndexMap<String, StepRunRecord>) {
    loop {
        let mut changed = false;
        for step in &workflow.steps {
            if records[&step.id].status != StepStatus::Pending {
                continue;
            }
            let blocked = step.depends_on.iter().find(|dep| {
                matches!(
                    records[*dep].status,
                    StepStatus::Failed | StepStatus::Skipped
                )
            });
            if let Some(dep) = blocked {
                let reason = format!("dependency '{dep}' did not succeed");
                records
                    .get_mut(&step.id)
                    .expect("record exists")
                    .mark_skipped(reason);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Steps still pending when the run settles were never dispatched; give
/// them a terminal Skipped record with a reason.
fn skip_remaining(
    workflow: &WorkflowDefinition,
    records: &mut IndexMap<String, StepRunRecord>,
    cancelled: bool,
) {
    let pending: Vec<String> = records
        .values()
        .filter(|r| r.status == StepStatus::Pending)
        .map(|r| r.step_id.clone())
        .collect();

    for step_id in pending {
        let blocked_dep = workflow.get_step(&step_id).and_then(|step| {
            step.depends_on
                .iter()
                .find(|dep| records[*dep].status != StepStatus::Success)
                .cloned()
        });
        let reason = match blocked_dep {
            Some(dep) => format!("dependency '{dep}' did not succeed"),
            None if cancelled => "run cancelled before dispatch".to_string(),
            None => "not dispatched: run halted after earlier failure".to_string(),
        };
        records
            .get_mut(&step_id)
            .expect("record exists")
            .mark_skipped(reason);
    }
}

/// The default final outputs: the output map of the last step in
/// declaration order that completed successfully. Deterministic for a
/// given successful run; graphs with several terminal steps inherit this
/// rule unchanged.
fn final_outputs(workflow: &WorkflowDefinition, records: &[StepRunRecord]) -> ValueMap {
    let by_id: HashMap<&str, &StepRunRecord> =
        records.iter().map(|r| (r.step_id.as_str(), r)).collect();

    workflow
        .steps
        .iter()
        .rev()
        .find_map(|step| {
            by_id
                .get(step.id.as_str())
                .filter(|r| r.is_successful())
                .and_then(|r| r.outputs.clone())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{InputSource, Step};
    use crate::tasks::{TaskCapability, TaskMetadata};
    use serde_json::json;

    struct Concat;

    #[async_trait]
    impl TaskCapability for Concat {
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

    struct AlwaysFails;

    #[async_trait]
    impl TaskCapability for AlwaysFails {
        async fn execute(&self, _inputs: ValueMap) -> TaskExecution {
            TaskExecution::fail("deliberate failure")
        }
    }

    fn registry() -> Arc<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        registry.register(
            "concat",
            None,
            TaskMetadata {
                task_type: "script".to_string(),
                tags: vec![],
            },
            Arc::new(Concat),
        );
        registry.register(
            "broken",
            None,
            TaskMetadata {
                task_type: "script".to_string(),
                tags: vec![],
            },
            Arc::new(AlwaysFails),
        );
        Arc::new(registry)
    }

    fn step(id: &str, task: &str, depends_on: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            name: None,
            task: task.to_string(),
            task_version: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            inputs: IndexMap::new(),
        }
    }

    fn workflow(mode: ExecutionMode, steps: Vec<Step>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: "wf-test".to_string(),
            name: "test".to_string(),
            description: None,
            mode,
            on_error: ErrorHandlingConfig::StopOnError,
            steps,
        }
    }

    fn static_input(value: serde_json::Value) -> InputSource {
        InputSource::Static { value }
    }

    #[tokio::test]
    async fn test_sequential_chain_merges_outputs() {
        let mut a = step("a", "concat", &[]);
        a.inputs
            .insert("text".to_string(), static_input(json!("x")));
        let mut b = step("b", "concat", &[]);
        b.inputs
            .insert("text".to_string(), static_input(json!("y")));
        let mut c = step("c", "concat", &["a", "b"]);
        c.inputs.insert(
            "left".to_string(),
            InputSource::StepOutput {
                step: "a".to_string(),
                output: "out".to_string(),
            },
        );
        c.inputs.insert(
            "right".to_string(),
            InputSource::StepOutput {
                step: "b".to_string(),
                output: "out".to_string(),
            },
        );

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute(
                &workflow(ExecutionMode::Sequential, vec![a, b, c]),
                ValueMap::new(),
            )
            .await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.final_outputs.get("out"), Some(&json!("xy")));
        assert!(result.error_message.is_none());
        assert_eq!(result.summary.succeeded, 3);
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent() {
        let a = step("a", "broken", &[]);
        let b = step("b", "concat", &["a"]);

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute(
                &workflow(ExecutionMode::Sequential, vec![a, b]),
                ValueMap::new(),
            )
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(
            result.get_step_result("a").unwrap().status,
            StepStatus::Failed
        );
        assert_eq!(
            result.get_step_result("b").unwrap().status,
            StepStatus::Skipped
        );
        let message = result.error_message.unwrap();
        assert!(message.contains("'a'"), "error should reference a: {message}");
    }

    #[tokio::test]
    async fn test_preflight_failure_produces_zero_records() {
        let a = step("a", "concat", &["missing"]);

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute(&workflow(ExecutionMode::Parallel, vec![a]), ValueMap::new())
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.step_results.is_empty());
        assert!(result.error_message.unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_constraint_violation_dispatches_nothing() {
        let a = step("a", "concat", &[]);

        let engine = WorkflowEngine::new(registry()).with_constraints(ArchitecturalConstraints {
            prohibited_task_types: Some(vec!["script".to_string()]),
            ..Default::default()
        });
        let result = engine
            .execute(
                &workflow(ExecutionMode::Sequential, vec![a]),
                ValueMap::new(),
            )
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.step_results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_fails_run_with_names() {
        let mut a = step("a", "concat", &[]);
        a.inputs
            .insert("text".to_string(), static_input(json!("x")));
        let mut b = step("b", "concat", &["a"]);
        b.inputs.insert(
            "left".to_string(),
            InputSource::StepOutput {
                step: "a".to_string(),
                output: "nonexistent".to_string(),
            },
        );

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute(
                &workflow(ExecutionMode::Parallel, vec![a, b]),
                ValueMap::new(),
            )
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        let record = result.get_step_result("b").unwrap();
        assert_eq!(record.status, StepStatus::Failed);
        let error = record.error.as_ref().unwrap();
        assert!(error.contains("nonexistent"));
        assert!(error.contains("out"), "should list available outputs: {error}");
    }

    #[tokio::test]
    async fn test_fallback_chain_mirrors_fallback_status() {
        struct StubRunner;

        #[async_trait]
        impl SubWorkflowRunner for StubRunner {
            async fn run_workflow(
                &self,
                workflow_id: &str,
                _inputs: ValueMap,
            ) -> WorkflowRunResult {
                let mut result =
                    WorkflowRunResult::new("fb-run".to_string(), workflow_id.to_string());
                let mut record = StepRunRecord::new("rescue".to_string());
                record.mark_running(ValueMap::new());
                let mut outputs = ValueMap::new();
                outputs.insert("saved".to_string(), json!(true));
                record.mark_success(outputs.clone());
                result.step_results.push(record);
                result.final_outputs = outputs;
                result.mark_completed(RunStatus::Success, None);
                result
            }
        }

        let a = step("a", "broken", &[]);
        let mut wf = workflow(ExecutionMode::Sequential, vec![a]);
        wf.on_error = ErrorHandlingConfig::FallbackChain {
            fallback_workflow: "wf-rescue".to_string(),
        };

        let engine = WorkflowEngine::new(registry()).with_sub_workflow_runner(Arc::new(StubRunner));
        let result = engine.execute(&wf, ValueMap::new()).await;

        assert_eq!(result.status, RunStatus::Success);
        // Both step logs retained: the failed outer step and the fallback's.
        assert_eq!(result.step_results.len(), 2);
        assert_eq!(result.final_outputs.get("saved"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_fallback_without_runner_fails() {
        let a = step("a", "broken", &[]);
        let mut wf = workflow(ExecutionMode::Sequential, vec![a]);
        wf.on_error = ErrorHandlingConfig::FallbackChain {
            fallback_workflow: "wf-rescue".to_string(),
        };

        let engine = WorkflowEngine::new(registry());
        let result = engine.execute(&wf, ValueMap::new()).await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.error_message.unwrap().contains("wf-rescue"));
    }

    #[tokio::test]
    async fn test_cancellation_marks_run_cancelled() {
        let a = step("a", "concat", &[]);
        let b = step("b", "concat", &["a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute_cancellable(
                &workflow(ExecutionMode::Parallel, vec![a, b]),
                ValueMap::new(),
                cancel,
            )
            .await;

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(result
            .step_results
            .iter()
            .all(|r| r.status == StepStatus::Skipped));
    }

    #[tokio::test]
    async fn test_final_outputs_last_successful_in_declaration_order() {
        let mut a = step("a", "concat", &[]);
        a.inputs
            .insert("text".to_string(), static_input(json!("first")));
        let mut b = step("b", "concat", &[]);
        b.inputs
            .insert("text".to_string(), static_input(json!("second")));

        let engine = WorkflowEngine::new(registry());
        let result = engine
            .execute(
                &workflow(ExecutionMode::Parallel, vec![a, b]),
                ValueMap::new(),
            )
            .await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.final_outputs.get("out"), Some(&json!("second")));
    }
}
