// ABOUTME: Resource-limited subprocess execution in an exclusive temporary directory
// ABOUTME: Launch failures and timeouts share one (-1, stderr) result shape

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Environment variables stripped before launch to reduce accidental
/// network egress through ambient proxies.
const PROXY_ENV_VARS: &[&str] = &[
    "http_proxy",
    "https_proxy",
    "all_proxy",
    "no_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "NO_PROXY",
];

/// Resource ceilings applied to one sandboxed process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandboxLimits {
    /// Wall-clock bound, independent of CPU time.
    pub wall_timeout: Duration,
    /// Hard CPU-time ceiling (RLIMIT_CPU on Unix).
    pub cpu_time_limit: Duration,
    /// Hard virtual-memory ceiling in megabytes (RLIMIT_AS on Unix).
    pub memory_limit_mb: u64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            wall_timeout: Duration::from_secs(300),
            cpu_time_limit: Duration::from_secs(60),
            memory_limit_mb: 512,
        }
    }
}

/// What one sandboxed run produced. Launch failures and timeouts are
/// reported in-band: `exit_code` is `-1` and `stderr` carries the
/// description, so callers never have to distinguish "ran and failed"
/// from "could not start" structurally.
#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The working directory the process ran in. Already removed by the
    /// time the call returns.
    pub workdir: PathBuf,
}

impl SandboxOutput {
    fn failure(stderr: String, workdir: PathBuf) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr,
            workdir,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == -1 && self.stderr.contains("TimeoutExpired")
    }
}

/// Executes one external command per call inside a freshly created,
/// exclusive temporary working directory, removed on every exit path.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> SandboxLimits {
        self.limits
    }

    /// Whether CPU-time and memory ceilings are actually enforced on this
    /// platform. When false, those two limits are best-effort no-ops and
    /// only the wall-clock timeout applies.
    pub fn supports_resource_limits() -> bool {
        cfg!(unix)
    }

    /// Run `program` with `args` under the configured limits.
    ///
    /// `extra_env` is merged after proxy variables are stripped, so a
    /// caller can deliberately reintroduce one.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        extra_env: &HashMap<String, String>,
    ) -> SandboxOutput {
        let workdir = match TempDir::new() {
            Ok(dir) => dir,
            Err(err) => {
                return SandboxOutput::failure(
                    format!("failed to create sandbox directory: {err}"),
                    PathBuf::new(),
                );
            }
        };
        let workdir_path = workdir.path().to_path_buf();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for var in PROXY_ENV_VARS {
            cmd.env_remove(var);
        }
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        self.apply_resource_limits(&mut cmd);

        debug!(program, ?args, workdir = %workdir_path.display(), "launching sandboxed process");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return SandboxOutput::failure(
                    format!("failed to launch '{program}': {err}"),
                    workdir_path,
                );
            }
        };

        // Dropping the wait future on timeout drops the child handle, and
        // kill_on_drop terminates the process.
        let wall = self.limits.wall_timeout;
        let output = match timeout(wall, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return SandboxOutput::failure(
                    format!("failed waiting for '{program}': {err}"),
                    workdir_path,
                );
            }
            Err(_) => {
                warn!(program, timeout_secs = wall.as_secs(), "sandboxed process timed out");
                return SandboxOutput::failure(
                    format!(
                        "TimeoutExpired: process exceeded {}s wall clock limit",
                        wall.as_secs()
                    ),
                    workdir_path,
                );
            }
        };

        let mut stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = match output.status.code() {
            Some(code) => code,
            None => {
                // Killed by a signal; RLIMIT breaches on Unix land here
                // (SIGKILL for memory, SIGXCPU for CPU time).
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&describe_signal_exit(&output.status));
                -1
            }
        };

        SandboxOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            workdir: workdir_path,
        }
    }

    #[cfg(unix)]
    fn apply_resource_limits(&self, cmd: &mut Command) {
        let cpu_secs = self.limits.cpu_time_limit.as_secs();
        let memory_bytes = self.limits.memory_limit_mb.saturating_mul(1024 * 1024);

        unsafe {
            cmd.pre_exec(move || {
                let cpu = libc::rlimit {
                    rlim_cur: cpu_secs as libc::rlim_t,
                    rlim_max: cpu_secs as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_CPU, &cpu) != 0 {
                    return Err(std::io::Error::last_os_error());
                }

                let memory = libc::rlimit {
                    rlim_cur: memory_bytes as libc::rlim_t,
                    rlim_max: memory_bytes as libc::rlim_t,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &memory) != 0 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
    }

    #[cfg(not(unix))]
    fn apply_resource_limits(&self, _cmd: &mut Command) {
        // No rlimit primitive here; only the wall-clock timeout applies.
        // Callers can check Sandbox::supports_resource_limits().
    }
}

#[cfg(unix)]
fn describe_signal_exit(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("process terminated by signal {signal}"),
        None => "process terminated without exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal_exit(_status: &std::process::ExitStatus) -> String {
    "process terminated without exit code".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_command_captures_stdout() {
        let sandbox = Sandbox::default();
        let output = sandbox
            .run("echo", &strings(&["hello sandbox"]), &HashMap::new())
            .await;

        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello sandbox"));
        assert!(!output.timed_out());
    }

    #[tokio::test]
    async fn test_runs_in_fresh_directory_removed_afterwards() {
        let sandbox = Sandbox::default();
        let output = sandbox.run("pwd", &[], &HashMap::new()).await;

        assert_eq!(output.exit_code, 0);
        let reported = PathBuf::from(output.stdout.trim());
        // The process ran inside the sandbox directory, and the directory
        // is gone once the call returns.
        assert_eq!(
            reported.file_name(),
            output.workdir.file_name(),
            "process should run inside the sandbox workdir"
        );
        assert!(!output.workdir.exists());
    }

    #[tokio::test]
    async fn test_wall_timeout_returns_distinguished_result() {
        let sandbox = Sandbox::new(SandboxLimits {
            wall_timeout: Duration::from_millis(200),
            ..Default::default()
        });
        let output = sandbox
            .run("sleep", &strings(&["5"]), &HashMap::new())
            .await;

        assert_eq!(output.exit_code, -1);
        assert!(output.stderr.contains("TimeoutExpired"));
        assert!(output.timed_out());
        assert!(!output.workdir.exists());
    }

    #[tokio::test]
    async fn test_launch_failure_same_shape() {
        let sandbox = Sandbox::default();
        let output = sandbox
            .run("/nonexistent/binary-xyz", &[], &HashMap::new())
            .await;

        assert_eq!(output.exit_code, -1);
        assert!(output.stderr.contains("failed to launch"));
        assert!(!output.timed_out());
    }

    #[tokio::test]
    async fn test_proxy_vars_stripped_and_extra_env_merged() {
        let sandbox = Sandbox::default();
        let mut extra = HashMap::new();
        extra.insert("SANDBOX_MARKER".to_string(), "present".to_string());

        let output = sandbox
            .run(
                "sh",
                &strings(&["-c", "echo \"proxy=[$HTTP_PROXY] marker=[$SANDBOX_MARKER]\""]),
                &extra,
            )
            .await;

        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("proxy=[]"));
        assert!(output.stdout.contains("marker=[present]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resource_limits_reported_supported() {
        assert!(Sandbox::supports_resource_limits());
    }
}
