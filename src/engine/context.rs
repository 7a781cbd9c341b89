// ABOUTME: Run context owned exclusively by one orchestrator invocation
// ABOUTME: Maps workflow_inputs plus each completed step id to its output map

use indexmap::IndexMap;
use serde_json::Value;

/// An ordered map of named JSON values, used for step inputs and outputs.
pub type ValueMap = IndexMap<String, Value>;

/// Key under which the caller-supplied workflow inputs live.
pub const WORKFLOW_INPUTS_KEY: &str = "workflow_inputs";

/// Accumulated state of one run: the initial workflow inputs plus the
/// output map of every completed step, keyed by step id.
///
/// Owned exclusively by one orchestrator invocation and never shared
/// across runs. Concurrent steps only read completed entries; the
/// coordinating loop performs every insert, so no locking is needed.
#[derive(Debug, Clone)]
pub struct RunContext {
    entries: IndexMap<String, ValueMap>,
}

impl RunContext {
    pub fn new(workflow_inputs: ValueMap) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(WORKFLOW_INPUTS_KEY.to_string(), workflow_inputs);
        Self { entries }
    }

    pub fn workflow_inputs(&self) -> &ValueMap {
        // The constructor always seeds this entry.
        self.entries
            .get(WORKFLOW_INPUTS_KEY)
            .expect("run context missing workflow_inputs entry")
    }

    /// Output map of a completed step, if it has one.
    pub fn outputs_of(&self, step_id: &str) -> Option<&ValueMap> {
        if step_id == WORKFLOW_INPUTS_KEY {
            return None;
        }
        self.entries.get(step_id)
    }

    /// Record a completed step's outputs. Each step writes exactly one
    /// entry, its own id, once.
    pub fn record_outputs(&mut self, step_id: String, outputs: ValueMap) {
        self.entries.insert(step_id, outputs);
    }

    /// Step ids with recorded outputs, in completion order.
    pub fn completed_steps(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|k| *k != WORKFLOW_INPUTS_KEY)
    }
}
