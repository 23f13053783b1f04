// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the flowtask CLI structure and its run, plan, and list subcommands

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowtask")]
#[command(about = "Discover declarative tasks and run them as priority-ordered flows")]
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
    /// Discover tasks and run a flow
    Run {
        #[arg(help = "Name of the flow to run")]
        flow: String,

        #[arg(short, long, help = "Directory of task definition files")]
        tasks_dir: Option<PathBuf>,

        #[arg(
            short = 'V',
            long = "var",
            help = "Initial store value (key=value, value parsed as JSON when possible)"
        )]
        vars: Vec<String>,

        #[arg(short, long, help = "Write the final store to this file instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Build and validate a flow's plan without executing it
    Plan {
        #[arg(help = "Name of the flow to plan")]
        flow: String,

        #[arg(short, long, help = "Directory of task definition files")]
        tasks_dir: Option<PathBuf>,

        #[arg(short = 'V', long = "var", help = "Initial store value (key=value)")]
        vars: Vec<String>,
    },

    /// List discovered flows and their tasks
    List {
        #[arg(short, long, help = "Directory of task definition files")]
        tasks_dir: Option<PathBuf>,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse `key=value` pairs into store values
    ///
    /// Values that parse as JSON keep their type (`n=3`, `ok=true`); anything
    /// else is taken as a plain string.
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<IndexMap<String, Value>> {
        let mut variables = IndexMap::new();

        for var in vars {
            match var.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    let value = serde_json::from_str(value)
                        .unwrap_or_else(|_| Value::String(value.to_string()));
                    variables.insert(key.trim().to_string(), value);
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid variable format '{}'. Expected 'key=value'",
                        var
                    ));
                }
            }
        }

        Ok(variables)
    }
}
