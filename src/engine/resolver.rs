// ABOUTME: Input resolution from static values, workflow inputs, and step outputs
// ABOUTME: Pure function of the step and run context, invoked immediately before dispatch

use crate::definition::{InputSource, Step};

use super::context::{RunContext, ValueMap};
use super::error::UnresolvedInput;

/// Materialize the concrete input values for a step from the accumulated
/// run context.
///
/// Pure function of its two arguments: no I/O, no hidden state, so
/// resolving the same step against the same context twice yields identical
/// results. Called immediately before dispatch so it always sees the
/// freshest context.
pub fn resolve_inputs(step: &Step, context: &RunContext) -> Result<ValueMap, UnresolvedInput> {
    let mut resolved = ValueMap::new();

    for (param, source) in &step.inputs {
        let value = match source {
            InputSource::Static { value } => value.clone(),

            InputSource::WorkflowInput { key } => match context.workflow_inputs().get(key) {
                Some(value) => value.clone(),
                None => {
                    return Err(UnresolvedInput::MissingWorkflowInput {
                        step: step.id.clone(),
                        param: param.clone(),
                        key: key.clone(),
                        available: context
                            .workflow_inputs()
                            .keys()
                            .cloned()
                            .collect(),
                    });
                }
            },

            InputSource::StepOutput {
                step: source_id,
                output,
            } => {
                let outputs = context.outputs_of(source_id).ok_or_else(|| {
                    UnresolvedInput::InvalidStepReference {
                        step: step.id.clone(),
                        param: param.clone(),
                        source_step: source_id.clone(),
                    }
                })?;

                match outputs.get(output) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(UnresolvedInput::MissingOutput {
                            step: step.id.clone(),
                            param: param.clone(),
                            source_step: source_id.clone(),
                            output: output.clone(),
                            available: outputs.keys().cloned().collect(),
                        });
                    }
                }
            }
        };

        resolved.insert(param.clone(), value);
    }

    Ok(resolved)
}
