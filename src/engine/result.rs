// ABOUTME: Step execution record types and workflow run result aggregation
// ABOUTME: Field names on the run result are part of the persistence contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ValueMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

/// Record of one step's execution within a run. Created when the step is
/// dispatched, finalized when it terminates, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRunRecord {
    pub step_id: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub resolved_inputs: Option<ValueMap>,
    pub outputs: Option<ValueMap>,
    pub error: Option<String>,
    pub retry_count: u32,
}

/// The complete, terminal record of one workflow run.
///
/// Serialized field names (`step_results`, `final_outputs`, `error_message`,
/// `started_at`, `finished_at`) are preserved verbatim for compatibility
/// with existing persistence schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunResult {
    pub run_id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub step_results: Vec<StepRunRecord>,
    pub final_outputs: ValueMap,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
}

impl StepRunRecord {
    pub fn new(step_id: String) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            resolved_inputs: None,
            outputs: None,
            error: None,
            retry_count: 0,
        }
    }

    pub fn mark_running(&mut self, resolved_inputs: ValueMap) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
        self.resolved_inputs = Some(resolved_inputs);
    }

    pub fn mark_success(&mut self, outputs: ValueMap) {
        self.status = StepStatus::Success;
        self.finished_at = Some(Utc::now());
        self.outputs = Some(outputs);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Skipped;
        self.finished_at = Some(Utc::now());
        self.error = Some(reason.into());
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, StepStatus::Pending | StepStatus::Running)
    }

    pub fn is_successful(&self) -> bool {
        self.status == StepStatus::Success
    }
}

impl WorkflowRunResult {
    pub fn new(run_id: String, workflow_id: String) -> Self {
        Self {
            run_id,
            workflow_id,
            status: RunStatus::Pending,
            step_results: Vec::new(),
            final_outputs: ValueMap::new(),
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
            summary: RunSummary::default(),
        }
    }

    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
    }

    /// Finalize the run with a terminal status.
    pub fn mark_completed(&mut self, status: RunStatus, error_message: Option<String>) {
        self.status = status;
        self.error_message = error_message;
        self.finished_at = Some(Utc::now());
        self.update_summary();
    }

    pub fn get_step_result(&self, step_id: &str) -> Option<&StepRunRecord> {
        self.step_results.iter().find(|r| r.step_id == step_id)
    }

    pub fn has_failures(&self) -> bool {
        self.step_results
            .iter()
            .any(|r| r.status == StepStatus::Failed)
    }

    fn update_summary(&mut self) {
        let total = self.step_results.len();
        let succeeded = self
            .step_results
            .iter()
            .filter(|r| r.status == StepStatus::Success)
            .count();
        let failed = self
            .step_results
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .count();
        let skipped = self
            .step_results
            .iter()
            .filter(|r| r.status == StepStatus::Skipped)
            .count();

        let success_rate = if total > 0 {
            (succeeded as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        self.summary = RunSummary {
            total_steps: total,
            succeeded,
            failed,
            skipped,
            success_rate,
        };
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Success => write!(f, "success"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
