// ABOUTME: Pre-flight validation of a workflow against architectural constraints
// ABOUTME: Runs once before any step executes; every violation is fatal

use crate::definition::{ArchitecturalConstraints, WorkflowDefinition};
use crate::tasks::TaskMetadataLookup;

use super::error::ConstraintViolation;

/// Checks a workflow and its tasks' metadata against an externally
/// supplied policy before any execution starts.
///
/// Checks run in a fixed order (max-steps first, then per step in
/// declaration order) so violation messages are stable. The first
/// violation wins; no step is dispatched after a failure.
pub struct ConstraintValidator;

impl ConstraintValidator {
    pub fn validate(
        workflow: &WorkflowDefinition,
        constraints: &ArchitecturalConstraints,
        lookup: &dyn TaskMetadataLookup,
    ) -> Result<(), ConstraintViolation> {
        if let Some(limit) = constraints.max_steps {
            if workflow.steps.len() > limit {
                return Err(ConstraintViolation::TooManySteps {
                    actual: workflow.steps.len(),
                    limit,
                });
            }
        }

        for step in &workflow.steps {
            let metadata =
                lookup
                    .lookup(&step.task)
                    .ok_or_else(|| ConstraintViolation::TaskNotFound {
                        step: step.id.clone(),
                        task: step.task.clone(),
                    })?;

            if let Some(allowed) = &constraints.allowed_task_types {
                if !allowed.contains(&metadata.task_type) {
                    return Err(ConstraintViolation::TypeNotAllowed {
                        step: step.id.clone(),
                        task_type: metadata.task_type.clone(),
                        allowed: allowed.clone(),
                    });
                }
            }

            if let Some(prohibited) = &constraints.prohibited_task_types {
                if prohibited.contains(&metadata.task_type) {
                    return Err(ConstraintViolation::TypeProhibited {
                        step: step.id.clone(),
                        task_type: metadata.task_type.clone(),
                    });
                }
            }

            if let Some(required) = &constraints.required_tags {
                for tag in required {
                    if !metadata.tags.contains(tag) {
                        return Err(ConstraintViolation::MissingRequiredTag {
                            step: step.id.clone(),
                            tag: tag.clone(),
                        });
                    }
                }
            }

            if let Some(prohibited) = &constraints.prohibited_tags {
                for tag in prohibited {
                    if metadata.tags.contains(tag) {
                        return Err(ConstraintViolation::ProhibitedTag {
                            step: step.id.clone(),
                            tag: tag.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
