//! Gantry Launch
//!
//! Resolution and launch of distributed training jobs on a
//! slurm-style cluster:
//! - Resolving launch knobs into a validated topology and batch plan
//! - Managing the job's output workspace and append-only capture log
//! - Building the scheduler + training-driver invocation
//! - Supervising the launched job and teeing its output
//!
//! The pipeline is strictly linear: overrides → topology → workspace →
//! invocation → launched, captured job. Every configuration error
//! aborts before any scheduler resources are consumed.

pub mod config;
pub mod error;
pub mod invocation;
pub mod overrides;
pub mod params;
pub mod presets;
pub mod sink;
pub mod topology;
pub mod workspace;

pub use config::{JobConfiguration, KnobOverrides, DEFAULT_MASTER_PORT};
pub use error::{LaunchError, Result};
pub use invocation::{Invocation, LaunchContext, SchedulerRequest};
pub use overrides::OverrideStore;
pub use params::{Precision, TrainingParameters};
pub use presets::{Preset, PresetLibrary};
pub use sink::launch;
pub use topology::{resolve, BatchPlan, JobTopology};
pub use workspace::{OutputWorkspace, LOG_FILE_NAME};
