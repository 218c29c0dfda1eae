//! Gantry CLI - launcher for distributed training jobs.
//!
//! Provides a `gantry` command that resolves experiment presets plus
//! overrides into a fully-specified scheduler invocation, and
//! supervises the launched job.

mod commands;

use clap::{Args, Parser, Subcommand};
use gantry_launch::KnobOverrides;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Gantry - distributed training job launcher
///
/// Resolves a handful of launch knobs (GPU count, batch sizes,
/// partition, quota class) into a consistent scheduler job
/// description, then launches and supervises it.
#[derive(Parser, Debug)]
#[command(
    name = "gantry",
    author,
    version,
    about = "Gantry - distributed training job launcher"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Knob overrides shared by `plan` and `launch`.
///
/// Precedence per knob: flag, then environment variable (GPUS,
/// BATCH_SIZE, PARTITION, ...), then the preset default. Unset or
/// empty values fall through.
#[derive(Args, Debug, Default)]
struct OverrideArgs {
    /// Total GPU count for the job
    #[arg(long)]
    gpus: Option<u64>,

    /// GPUs per node
    #[arg(long)]
    gpus_per_node: Option<u64>,

    /// Global batch size (across all workers and accumulation steps)
    #[arg(long)]
    batch_size: Option<u64>,

    /// Per-GPU batch size per forward/backward pass
    #[arg(long)]
    per_device_batch_size: Option<u64>,

    /// CPU count per scheduler task
    #[arg(long)]
    cpus_per_task: Option<u64>,

    /// Scheduler partition
    #[arg(long)]
    partition: Option<String>,

    /// Scheduler quota class
    #[arg(long)]
    quota_type: Option<String>,

    /// Distributed rendezvous port
    #[arg(long)]
    master_port: Option<u16>,

    /// Output directory (holds checkpoints and training_log.txt)
    #[arg(long)]
    output_dir: Option<String>,

    /// Extra scheduler argument, appended verbatim (repeatable)
    #[arg(long = "scheduler-arg")]
    scheduler_args: Vec<String>,

    /// TOML file of extra presets, shadowing built-ins by name
    #[arg(long)]
    preset_file: Option<PathBuf>,
}

impl OverrideArgs {
    fn to_knobs(&self) -> KnobOverrides {
        KnobOverrides {
            gpus: self.gpus,
            gpus_per_node: self.gpus_per_node,
            batch_size: self.batch_size,
            per_device_batch_size: self.per_device_batch_size,
            cpus_per_task: self.cpus_per_task,
            partition: self.partition.clone(),
            quota_type: self.quota_type.clone(),
            master_port: self.master_port,
            output_dir: self.output_dir.clone(),
            scheduler_args: self.scheduler_args.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available experiment presets
    Presets {
        /// TOML file of extra presets, shadowing built-ins by name
        #[arg(long)]
        preset_file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a preset and print the invocation without launching
    ///
    /// The printed command is byte-identical to what `launch` would
    /// run with the same inputs, so it doubles as the audit record of
    /// an experiment.
    Plan {
        /// Preset name
        preset: String,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Output the resolved configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve, build, and launch a training job
    ///
    /// Ensures the output directory exists, launches the job under the
    /// scheduler, and tees its output to the terminal and to
    /// `output_dir/training_log.txt`. Blocks until the job finishes
    /// and exits with the job's own exit code.
    Launch {
        /// Preset name
        preset: String,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Presets { preset_file, json } => commands::presets::execute(preset_file.as_deref(), json),
        Command::Plan { preset, overrides, json } => {
            commands::plan::execute(&preset, &overrides.to_knobs(), overrides.preset_file.as_deref(), json)
        }
        Command::Launch { preset, overrides } => {
            commands::launch::execute(&preset, &overrides.to_knobs(), overrides.preset_file.as_deref()).await
        }
    }
}
