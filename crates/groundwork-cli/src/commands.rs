//! CLI command implementations.
//!
//! Apply and destroy run against the in-memory provisioner, so they
//! exercise the full composition and ordering machinery without touching
//! real infrastructure.

use std::sync::Arc;

use anyhow::{Context, Result};
use groundwork_config::{parse_stack_config, StackConfig};
use groundwork_engine::{ApplyEngine, MemoryProvisioner};
use groundwork_providers::{compose_stack, ComposedStack};

fn load_stack(path: &str, environment: Option<&str>) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration from {path}"))?;
    let config = parse_stack_config(&content, environment)?;
    Ok(config)
}

fn compose(path: &str, environment: Option<&str>) -> Result<ComposedStack> {
    let config = load_stack(path, environment)?;
    Ok(compose_stack(&config)?)
}

pub fn validate(path: &str, environment: Option<&str>) -> Result<()> {
    match compose(path, environment) {
        Ok(stack) => {
            // A derivable order proves the graph is complete and acyclic.
            stack.composition.ordered()?;
            println!(
                "Configuration is valid ({} resources)",
                stack.composition.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn plan(path: &str, environment: Option<&str>, json: bool) -> Result<()> {
    let stack = compose(path, environment)?;
    let engine = ApplyEngine::new(Arc::new(MemoryProvisioner::default()));
    let plan = engine.plan(&stack.composition)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Plan: {} resources to apply", plan.steps.len());
        print!("{plan}");
    }
    Ok(())
}

pub async fn apply(path: &str, environment: Option<&str>) -> Result<()> {
    let stack = compose(path, environment)?;
    let engine = ApplyEngine::new(Arc::new(MemoryProvisioner::default()));
    let report = engine.apply(&stack.composition).await?;

    println!("Applied {} resources", report.order.len());
    for id in &report.order {
        println!("  ✓ {id}");
    }
    Ok(())
}

pub async fn destroy(path: &str, environment: Option<&str>) -> Result<()> {
    let stack = compose(path, environment)?;
    let provisioner = Arc::new(MemoryProvisioner::default());
    let engine = ApplyEngine::new(provisioner.clone());

    engine.destroy(&stack.composition).await?;
    for id in provisioner.destroy_log() {
        println!("  - {id}");
    }
    println!("Destroyed {} resources", stack.composition.len());
    Ok(())
}
