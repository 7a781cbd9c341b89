// ABOUTME: Configuration management for the switchyard application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::sandbox::SandboxLimits;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_parallel")]
    pub max_parallel_steps: usize,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub memory_limit_mb: u64,
    pub cpu_time_limit_secs: u64,
    pub wall_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_max_parallel() -> usize {
    crate::engine::DEFAULT_MAX_PARALLEL_STEPS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel_steps: default_max_parallel(),
            sandbox: SandboxConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        let limits = SandboxLimits::default();
        Self {
            memory_limit_mb: limits.memory_limit_mb,
            cpu_time_limit_secs: limits.cpu_time_limit.as_secs(),
            wall_timeout_secs: limits.wall_timeout.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = serde_yaml::from_str(&contents)?;
            config.merge_env()?;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.merge_env()?;
            Ok(config)
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Result<PathBuf> {
        let possible_paths = vec![
            PathBuf::from("switchyard.yaml"),
            PathBuf::from("switchyard.yml"),
            PathBuf::from(".switchyard.yaml"),
            PathBuf::from(".switchyard.yml"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".switchyard").join("config.yaml");
            if home_config.exists() {
                return Ok(home_config);
            }
        }

        for path in possible_paths {
            if path.exists() {
                return Ok(path);
            }
        }

        Ok(PathBuf::from("switchyard.yaml"))
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        if let Ok(max_parallel) = std::env::var("SWITCHYARD_MAX_PARALLEL") {
            self.max_parallel_steps = max_parallel.parse()?;
        }

        if let Ok(memory) = std::env::var("SWITCHYARD_SANDBOX_MEMORY_MB") {
            self.sandbox.memory_limit_mb = memory.parse()?;
        }
        if let Ok(cpu) = std::env::var("SWITCHYARD_SANDBOX_CPU_SECS") {
            self.sandbox.cpu_time_limit_secs = cpu.parse()?;
        }
        if let Ok(wall) = std::env::var("SWITCHYARD_SANDBOX_WALL_SECS") {
            self.sandbox.wall_timeout_secs = wall.parse()?;
        }

        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SWITCHYARD_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Sandbox limits implied by this configuration.
    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            wall_timeout: Duration::from_secs(self.sandbox.wall_timeout_secs),
            cpu_time_limit: Duration::from_secs(self.sandbox.cpu_time_limit_secs),
            memory_limit_mb: self.sandbox.memory_limit_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_and_sandbox() {
        let config = Config::default();
        assert_eq!(config.max_parallel_steps, 4);
        assert_eq!(config.sandbox_limits(), SandboxLimits::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
max_parallel_steps: 8
sandbox:
  memory_limit_mb: 1024
  cpu_time_limit_secs: 30
  wall_timeout_secs: 120
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_parallel_steps, 8);
        assert_eq!(config.sandbox.memory_limit_mb, 1024);
        assert_eq!(config.logging.format, "pretty");
    }
}
