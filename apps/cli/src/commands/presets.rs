//! Preset listing command.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

pub fn execute(preset_file: Option<&Path>, json_output: bool) -> Result<()> {
    let library = super::load_library(preset_file)?;

    if json_output {
        let out: Vec<_> = library
            .iter()
            .map(|(name, p)| {
                json!({
                    "name": name,
                    "description": p.description,
                    "gpus": p.gpus,
                    "gpus_per_node": p.gpus_per_node,
                    "batch_size": p.batch_size,
                    "per_device_batch_size": p.per_device_batch_size,
                    "output_dir": p.output_dir,
                    "script": p.params.script,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Experiment Presets ({})", library.names().len()).bold().cyan());
    println!();
    println!("{:<22} {:>6} {:>8} {}", "Name", "GPUs", "Batch", "Description");
    println!("{}", "─".repeat(80));
    for (name, p) in library.iter() {
        println!(
            "{:<22} {:>6} {:>8} {}",
            name.cyan(),
            p.gpus,
            p.batch_size,
            p.description.dimmed()
        );
    }
    println!();
    Ok(())
}
