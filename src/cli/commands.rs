// ABOUTME: Command implementations for the flowtask CLI
// ABOUTME: Handles discovery plus the run, plan, and list commands

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::config::Config;
use crate::engine::{FlowEngine, RunFailure, Store};
use crate::flow::FlowRegistry;
use crate::loader::{FlowLoader, TaskLoader};
use crate::tasks::BehaviorCatalog;

/// Load every task unit under `tasks_dir`, printing discovery failures as warnings
pub fn discover(tasks_dir: &Path, recursive: bool) -> Result<FlowRegistry> {
    info!("Discovering tasks in {}", tasks_dir.display());

    let mut registry = FlowRegistry::new();
    let mut loader = TaskLoader::new(Arc::new(BehaviorCatalog::new())).with_recursive(recursive);
    let report = loader
        .load_collection(tasks_dir, &mut registry)
        .map_err(|e| anyhow::anyhow!("Task discovery failed: {}", e))?;

    for failure in &report.failures {
        eprintln!("warning: {}", failure);
    }
    info!("Discovery finished: {}", report.summary());

    Ok(registry)
}

fn tasks_dir(override_dir: Option<PathBuf>, config: &Config) -> PathBuf {
    override_dir.unwrap_or_else(|| config.tasks_dir.clone())
}

/// Execute a flow command
pub async fn run_flow(
    flow: String,
    tasks_dir_override: Option<PathBuf>,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let registry = discover(&tasks_dir(tasks_dir_override, config), config.recursive)?;
    let engine = FlowEngine::new(Arc::new(registry)).with_tracing();
    let params = Store::from(config.params.clone());

    match engine.run(&flow, Some(params)).await {
        Ok(report) => {
            let json_content = serde_json::to_string_pretty(&report.store)
                .map_err(|e| anyhow::anyhow!("Failed to serialize store to JSON: {}", e))?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, json_content).map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to write output file '{}': {}",
                        output_path.display(),
                        e
                    )
                })?;
                info!("Final store written to: {}", output_path.display());
            } else {
                println!("{}", json_content);
            }

            info!(
                "Flow '{}' completed in {:?} ({} steps)",
                report.flow,
                report.duration,
                report.steps.len()
            );
            Ok(())
        }
        Err(failure) => {
            print_failure(&failure);
            Err(anyhow::anyhow!(
                "Flow '{}' ended with state: {}",
                failure.flow,
                failure.state
            ))
        }
    }
}

fn print_failure(failure: &RunFailure) {
    eprintln!("Flow '{}' ended with state: {}", failure.flow, failure.state);
    eprintln!("  Cause: {}", failure.error);

    let reverted = failure.reverted_tasks();
    if !reverted.is_empty() {
        eprintln!("  Reverted: {}", reverted.join(", "));
    }
    for compensation in &failure.compensation_failures {
        warn!("{}", compensation);
        eprintln!("  Compensation failed: {}", compensation);
    }
}

/// Validate a flow's plan without running it
pub async fn plan_flow(
    flow: String,
    tasks_dir_override: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let registry = discover(&tasks_dir(tasks_dir_override, config), config.recursive)?;
    let engine = FlowEngine::new(Arc::new(registry));
    let params = Store::from(config.params.clone());

    let plan = engine
        .plan(&flow, &params)
        .map_err(|e| anyhow::anyhow!("Plan validation failed: {}", e))?;

    println!("✓ Flow '{}' is valid ({} steps)", plan.flow(), plan.len());
    for (index, step) in plan.steps().iter().enumerate() {
        println!(
            "  {:>2}. [{}] {}",
            index + 1,
            step.priority,
            step.task.identity()
        );
        if !step.task.requires().is_empty() {
            println!("      requires: {}", step.task.requires().join(", "));
        }
        if !step.task.provides().is_empty() {
            println!("      provides: {}", step.task.provides().join(", "));
        }
    }

    Ok(())
}

/// Print every discovered flow with its registered tasks
pub async fn list_flows(tasks_dir_override: Option<PathBuf>, config: &Config) -> Result<()> {
    let dir = tasks_dir(tasks_dir_override, config);
    let registry = discover(&dir, config.recursive)?;

    if registry.is_empty() {
        println!("No flows found in {}", dir.display());
        return Ok(());
    }

    for flow in registry.flow_names() {
        let entries = registry.lookup(flow)?;
        println!("{} ({} tasks)", flow, entries.len());
        for entry in entries {
            println!("  [{}] {}", entry.priority, entry.task.identity());
        }
    }

    Ok(())
}
