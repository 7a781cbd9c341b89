// ABOUTME: Retry scheduling for single step execution attempts
// ABOUTME: Exponential backoff sleeps between attempts before a failure becomes terminal

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::definition::ErrorHandlingConfig;
use crate::tasks::{TaskCapability, TaskExecution};

use super::context::ValueMap;

/// Retry plan for one step: how many re-attempts, and the backoff base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrySchedule {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl RetrySchedule {
    /// No retries: a single attempt whose failure is immediately terminal.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_factor: 1.0,
        }
    }

    /// The schedule implied by a workflow's error-handling strategy.
    /// Only `retry_with_backoff` produces re-attempts.
    pub fn from_strategy(strategy: &ErrorHandlingConfig) -> Self {
        match strategy {
            ErrorHandlingConfig::RetryWithBackoff {
                max_retries,
                backoff_factor,
            } => Self {
                max_retries: *max_retries,
                backoff_factor: *backoff_factor,
            },
            _ => Self::none(),
        }
    }

    /// Sleep duration before retry number `retry_index` (0-based):
    /// `backoff_factor ^ retry_index` seconds.
    pub fn delay_before(&self, retry_index: u32) -> Duration {
        let secs = self.backoff_factor.powi(retry_index as i32);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Execute one step's capability, re-attempting per the schedule.
///
/// Returns the final outcome and the number of retries that were used.
/// Only a failed execution is retried; a successful one returns
/// immediately.
pub async fn execute_with_retry(
    step_id: &str,
    capability: Arc<dyn TaskCapability>,
    inputs: ValueMap,
    schedule: RetrySchedule,
) -> (TaskExecution, u32) {
    let mut retries_used = 0;

    loop {
        debug!(
            step_id,
            attempt = retries_used + 1,
            "executing step capability"
        );

        let outcome = capability.execute(inputs.clone()).await;
        if outcome.success || retries_used >= schedule.max_retries {
            return (outcome, retries_used);
        }

        let delay = schedule.delay_before(retries_used);
        warn!(
            step_id,
            attempt = retries_used + 1,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            delay_secs = delay.as_secs_f64(),
            "step attempt failed, retrying after backoff"
        );
        sleep(delay).await;
        retries_used += 1;
    }
}
