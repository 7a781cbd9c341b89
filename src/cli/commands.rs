// ABOUTME: Command implementations for the switchyard CLI
// ABOUTME: Handles execution of the run and validate commands

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::definition::{ArchitecturalConstraints, WorkflowFile};
use crate::engine::{RunStatus, WorkflowEngine};
use crate::sandbox::{Sandbox, SandboxLimits};
use crate::tasks::{ScriptTask, TaskMetadata, TaskRegistry};

use super::args::Args;
use super::config::Config;

/// Execute a workflow file
pub async fn run_workflow(
    workflow_path: PathBuf,
    inputs: Vec<String>,
    dry_run: bool,
    output: Option<PathBuf>,
    max_parallel: Option<usize>,
    constraints_path: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Loading workflow: {}", workflow_path.display());

    let workflow_inputs = Args::parse_inputs(&inputs)?;
    let file = WorkflowFile::from_file(&workflow_path)
        .map_err(|e| anyhow::anyhow!("Failed to parse workflow: {}", e))?;
    info!(
        "Loaded workflow '{}' with {} steps",
        file.workflow.name,
        file.workflow.steps.len()
    );

    let registry = Arc::new(build_registry(&file, config.sandbox_limits()));

    let mut engine = WorkflowEngine::new(registry)
        .with_max_parallel(max_parallel.unwrap_or(config.max_parallel_steps));

    if let Some(path) = constraints_path {
        let contents = std::fs::read_to_string(&path)?;
        let constraints: ArchitecturalConstraints = serde_yaml::from_str(&contents)?;
        engine = engine.with_constraints(constraints);
    }

    if dry_run {
        let graph = engine
            .validate(&file.workflow)
            .map_err(|e| anyhow::anyhow!("Workflow validation failed: {}", e))?;
        println!("✓ Workflow '{}' is valid", file.workflow.name);
        for (level, steps) in graph.levels().iter().enumerate() {
            println!("  Level {}: {}", level, steps.join(", "));
        }
        return Ok(());
    }

    let result = engine.execute(&file.workflow, workflow_inputs).await;

    if let Some(output_path) = output {
        let json_content = serde_json::to_string_pretty(&result)
            .map_err(|e| anyhow::anyhow!("Failed to serialize result to JSON: {}", e))?;
        std::fs::write(&output_path, json_content).map_err(|e| {
            anyhow::anyhow!("Failed to write output file '{}': {}", output_path.display(), e)
        })?;
        info!("Result written to: {}", output_path.display());
    } else {
        println!(
            "Workflow '{}' completed with status: {}",
            file.workflow.name, result.status
        );
        for record in &result.step_results {
            println!("  Step '{}': {}", record.step_id, record.status);
            if let Some(ref error) = record.error {
                println!("    {}", error);
            }
        }
        if !result.final_outputs.is_empty() {
            println!(
                "Final outputs: {}",
                serde_json::to_string_pretty(&result.final_outputs)?
            );
        }
    }

    match result.status {
        RunStatus::Success => Ok(()),
        status => Err(anyhow::anyhow!(
            "Workflow run ended with status: {} ({})",
            status,
            result
                .error_message
                .unwrap_or_else(|| "no error message".to_string())
        )),
    }
}

/// Validate a workflow file without executing
pub async fn validate_workflow(workflow_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating workflow: {}", workflow_path.display());

    let file = WorkflowFile::from_file(&workflow_path)
        .map_err(|e| anyhow::anyhow!("Workflow validation failed: {}", e))?;

    let registry = Arc::new(build_registry(&file, config.sandbox_limits()));
    let engine = WorkflowEngine::new(registry);
    let graph = engine
        .validate(&file.workflow)
        .map_err(|e| anyhow::anyhow!("Workflow validation failed: {}", e))?;

    println!("✓ Workflow '{}' is valid", file.workflow.name);
    println!("  Steps: {}", file.workflow.steps.len());
    println!("  Execution order: {}", graph.topological_order().join(" -> "));

    Ok(())
}

/// Build a task registry from the script tasks a workflow file declares.
fn build_registry(file: &WorkflowFile, default_limits: SandboxLimits) -> TaskRegistry {
    let mut registry = TaskRegistry::new();

    for (task_id, spec) in &file.tasks {
        let mut limits = default_limits;
        if let Some(timeout) = spec.timeout {
            limits.wall_timeout = timeout;
        }

        let task = ScriptTask::new(&spec.interpreter, &spec.script, Sandbox::new(limits))
            .with_env(spec.env.clone());

        registry.register(
            task_id.clone(),
            None,
            TaskMetadata {
                task_type: "script".to_string(),
                tags: spec.tags.clone(),
            },
            Arc::new(task),
        );
    }

    registry
}
