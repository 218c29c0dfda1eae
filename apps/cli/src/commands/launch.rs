//! Launch command: resolve, build, launch, supervise.

use anyhow::{Context, Result};
use colored::Colorize;
use gantry_launch::{
    sink, JobConfiguration, KnobOverrides, LaunchContext, LaunchError, OutputWorkspace,
    OverrideStore,
};
use std::path::Path;
use tracing::info;

pub async fn execute(
    preset_name: &str,
    knobs: &KnobOverrides,
    preset_file: Option<&Path>,
) -> Result<()> {
    let library = super::load_library(preset_file)?;
    let preset = library.get(preset_name)?;
    let store = OverrideStore::from_env();

    // Resolution strictly precedes workspace creation, which strictly
    // precedes building, which strictly precedes launch.
    let cfg = JobConfiguration::resolve(preset_name, preset, &store, knobs)?;
    let workspace = OutputWorkspace::ensure(&cfg.output_dir)?;
    let context = LaunchContext::capture(cfg.master_port)
        .context("Failed to capture launch environment")?;
    let invocation = cfg.build_invocation(&context);

    info!(
        preset = preset_name,
        nodes = cfg.topology.node_count,
        tasks = cfg.topology.task_count,
        accumulation_steps = cfg.plan.gradient_accumulation_steps,
        "launching job"
    );
    println!("{} {}", "Launching:".bold().cyan(), preset_name);
    println!("  {}", invocation.command_line().dimmed());
    println!("  {} {}", "Log:".bold(), workspace.log_file().display());
    println!();

    let exit_code = sink::launch(&invocation, workspace.log_file()).await?;
    if exit_code != 0 {
        let failure = LaunchError::JobFailed { exit_code };
        eprintln!("{}", failure.to_string().red().bold());
        // Forward the job's exit code verbatim.
        std::process::exit(exit_code);
    }

    println!("{}", "Job completed".bold().green());
    Ok(())
}
