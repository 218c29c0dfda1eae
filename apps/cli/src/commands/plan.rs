//! Dry-run planning command.

use anyhow::{Context, Result};
use colored::Colorize;
use gantry_launch::{JobConfiguration, KnobOverrides, LaunchContext, OverrideStore};
use serde_json::json;
use std::path::Path;

pub fn execute(
    preset_name: &str,
    knobs: &KnobOverrides,
    preset_file: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let library = super::load_library(preset_file)?;
    let preset = library.get(preset_name)?;
    let store = OverrideStore::from_env();

    let cfg = JobConfiguration::resolve(preset_name, preset, &store, knobs)?;
    let context = LaunchContext::capture(cfg.master_port)
        .context("Failed to capture launch environment")?;
    let invocation = cfg.build_invocation(&context);

    if json_output {
        let out = json!({
            "configuration": cfg,
            "command": invocation.command_line(),
            "env": invocation.env,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Plan: {preset_name}").bold().cyan());
    println!();
    println!("  Nodes:               {}", cfg.topology.node_count);
    println!("  Tasks:               {} ({} per node)", cfg.topology.task_count, cfg.topology.tasks_per_node);
    println!("  Global batch size:   {}", cfg.plan.global_batch_size);
    println!("  Per-device batch:    {}", cfg.plan.per_device_batch_size);
    println!("  Accumulation steps:  {}", cfg.plan.gradient_accumulation_steps);
    println!("  Partition / quota:   {} / {}", cfg.request.partition, cfg.request.quota_type);
    println!("  Output dir:          {}", cfg.output_dir.display());
    println!("  Master port:         {}", cfg.master_port);
    println!();
    println!("{}", "Command:".bold());
    println!("  {}", invocation.command_line().dimmed());
    println!();
    Ok(())
}
