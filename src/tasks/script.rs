// ABOUTME: Script task kind executing an interpreter through the sandbox
// ABOUTME: Inputs arrive as JSON in STEP_INPUTS; the last stdout line may declare outputs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::engine::context::ValueMap;
use crate::sandbox::Sandbox;

use super::{TaskCapability, TaskExecution};

/// A task wrapping an external interpreter invocation.
///
/// The script body is written to a temporary file and handed to the
/// interpreter inside the sandbox. Resolved inputs are passed as a JSON
/// object in the `STEP_INPUTS` environment variable. If the last
/// non-empty line of stdout parses as a JSON object, that object becomes
/// the step's output map; otherwise the full stdout is exposed under the
/// `stdout` key.
pub struct ScriptTask {
    interpreter: String,
    script: String,
    env: HashMap<String, String>,
    sandbox: Sandbox,
}

impl ScriptTask {
    pub fn new(
        interpreter: impl Into<String>,
        script: impl Into<String>,
        sandbox: Sandbox,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            env: HashMap::new(),
            sandbox,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    fn parse_outputs(stdout: &str) -> ValueMap {
        if let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line.trim()) {
                return map.into_iter().collect();
            }
        }

        let mut outputs = ValueMap::new();
        outputs.insert("stdout".to_string(), json!(stdout.trim_end()));
        outputs
    }
}

#[async_trait]
impl TaskCapability for ScriptTask {
    async fn execute(&self, inputs: ValueMap) -> TaskExecution {
        let inputs_json = match serde_json::to_string(&inputs) {
            Ok(json) => json,
            Err(err) => {
                return TaskExecution::fail(format!("failed to serialize step inputs: {err}"));
            }
        };

        let mut script_file = match NamedTempFile::new() {
            Ok(file) => file,
            Err(err) => {
                return TaskExecution::fail(format!("failed to create script file: {err}"));
            }
        };
        if let Err(err) = script_file.write_all(self.script.as_bytes()) {
            return TaskExecution::fail(format!("failed to write script file: {err}"));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(script_file.path()) {
                let mut perms = metadata.permissions();
                perms.set_mode(0o755);
                let _ = std::fs::set_permissions(script_file.path(), perms);
            }
        }

        let mut env = self.env.clone();
        env.insert("STEP_INPUTS".to_string(), inputs_json);

        let script_path = script_file.path().to_string_lossy().into_owned();
        debug!(interpreter = %self.interpreter, script_bytes = self.script.len(), "running script task");

        // script_file stays alive until the sandboxed run settles.
        let output = self
            .sandbox
            .run(&self.interpreter, &[script_path], &env)
            .await;

        if output.exit_code == 0 {
            TaskExecution::ok(Self::parse_outputs(&output.stdout))
        } else {
            let detail = if output.stderr.trim().is_empty() {
                format!("interpreter exited with code {}", output.exit_code)
            } else {
                format!(
                    "interpreter exited with code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                )
            };
            TaskExecution::fail(detail)
        }
    }
}
