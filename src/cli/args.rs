// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for switchyard

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "A dependency-aware workflow orchestration engine with sandboxed task execution")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow from a YAML file
    Run {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,

        #[arg(
            short = 'i',
            long = "input",
            help = "Workflow input values (key=value, value parsed as JSON when possible)"
        )]
        inputs: Vec<String>,

        #[arg(long, help = "Dry run - validate without executing")]
        dry_run: bool,

        #[arg(short, long, help = "Write the run result JSON to this file")]
        output: Option<PathBuf>,

        #[arg(long, help = "Maximum number of concurrently running steps")]
        max_parallel: Option<usize>,

        #[arg(long, help = "Path to an architectural constraints YAML file")]
        constraints: Option<PathBuf>,
    },

    /// Validate a workflow file without executing
    Validate {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse workflow inputs from key=value pairs. Values that parse as
    /// JSON are kept typed; everything else becomes a string.
    pub fn parse_inputs(inputs: &[String]) -> anyhow::Result<crate::engine::ValueMap> {
        let mut values = crate::engine::ValueMap::new();

        for input in inputs {
            let Some((key, raw)) = input.split_once('=') else {
                return Err(anyhow::anyhow!(
                    "Invalid input format '{}'. Expected 'key=value'",
                    input
                ));
            };
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            values.insert(key.to_string(), value);
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inputs_typed_and_string() {
        let inputs = vec![
            "name=ada".to_string(),
            "count=42".to_string(),
            "flags=[1,2]".to_string(),
        ];

        let parsed = Args::parse_inputs(&inputs).unwrap();

        assert_eq!(parsed.get("name"), Some(&json!("ada")));
        assert_eq!(parsed.get("count"), Some(&json!(42)));
        assert_eq!(parsed.get("flags"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_parse_inputs_invalid() {
        let inputs = vec!["missing_equals".to_string()];
        assert!(Args::parse_inputs(&inputs).is_err());
    }
}
