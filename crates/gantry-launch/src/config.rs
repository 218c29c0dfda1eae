//! Job configuration resolution.
//!
//! `JobConfiguration` is the aggregate the rest of the pipeline runs
//! on: a validated topology and batch plan, the driver parameters, the
//! scheduler request, and the output path. It is resolved once per
//! launch and never mutated afterwards.

use crate::error::Result;
use crate::invocation::{Invocation, LaunchContext, SchedulerRequest};
use crate::overrides::{self, OverrideStore};
use crate::params::TrainingParameters;
use crate::presets::Preset;
use crate::topology::{self, BatchPlan, JobTopology};
use serde::Serialize;
use std::path::PathBuf;

/// Default rendezvous port when nothing overrides it.
pub const DEFAULT_MASTER_PORT: u16 = 29500;

/// Per-invocation knob overrides, typically clap flags. `None` falls
/// through to the environment, then the preset.
#[derive(Debug, Clone, Default)]
pub struct KnobOverrides {
    pub gpus: Option<u64>,
    pub gpus_per_node: Option<u64>,
    pub batch_size: Option<u64>,
    pub per_device_batch_size: Option<u64>,
    pub cpus_per_task: Option<u64>,
    pub partition: Option<String>,
    pub quota_type: Option<String>,
    pub master_port: Option<u16>,
    pub output_dir: Option<String>,
    pub scheduler_args: Vec<String>,
}

/// A fully-resolved, launchable job description.
#[derive(Debug, Clone, Serialize)]
pub struct JobConfiguration {
    pub preset: String,
    pub topology: JobTopology,
    pub plan: BatchPlan,
    pub params: TrainingParameters,
    pub request: SchedulerRequest,
    pub output_dir: PathBuf,
    pub master_port: u16,
}

impl JobConfiguration {
    /// Resolve a preset plus overrides into a validated configuration.
    ///
    /// Fails before anything is launched: a non-divisible topology or
    /// batch plan, or a malformed numeric override, aborts here.
    pub fn resolve(
        preset_name: &str,
        preset: &Preset,
        store: &OverrideStore,
        knobs: &KnobOverrides,
    ) -> Result<Self> {
        let gpus = store.resolve_u64(knobs.gpus, overrides::ENV_GPUS, preset.gpus)?;
        let gpus_per_node =
            store.resolve_u64(knobs.gpus_per_node, overrides::ENV_GPUS_PER_NODE, preset.gpus_per_node)?;
        let batch_size =
            store.resolve_u64(knobs.batch_size, overrides::ENV_BATCH_SIZE, preset.batch_size)?;
        let per_device_batch_size = store.resolve_u64(
            knobs.per_device_batch_size,
            overrides::ENV_PER_DEVICE_BATCH_SIZE,
            preset.per_device_batch_size,
        )?;
        let cpus_per_task =
            store.resolve_u64(knobs.cpus_per_task, overrides::ENV_CPUS_PER_TASK, preset.cpus_per_task)?;

        let (topology, plan) =
            topology::resolve(gpus, gpus_per_node, batch_size, per_device_batch_size, cpus_per_task)?;

        let request = SchedulerRequest {
            partition: store.resolve_str(
                knobs.partition.as_deref(),
                overrides::ENV_PARTITION,
                &SchedulerRequest::default().partition,
            ),
            quota_type: store.resolve_str(
                knobs.quota_type.as_deref(),
                overrides::ENV_QUOTA_TYPE,
                &SchedulerRequest::default().quota_type,
            ),
            extra_args: knobs.scheduler_args.clone(),
            ..SchedulerRequest::default()
        };

        let master_port =
            store.resolve_u16(knobs.master_port, overrides::ENV_MASTER_PORT, DEFAULT_MASTER_PORT)?;
        let output_dir = PathBuf::from(store.resolve_str(
            knobs.output_dir.as_deref(),
            overrides::ENV_OUTPUT_DIR,
            &preset.output_dir,
        ));

        Ok(Self {
            preset: preset_name.to_string(),
            topology,
            plan,
            params: preset.params.clone(),
            request,
            output_dir,
            master_port,
        })
    }

    /// Build the launchable command for this configuration.
    #[must_use]
    pub fn build_invocation(&self, context: &LaunchContext) -> Invocation {
        Invocation::build(
            &self.topology,
            &self.plan,
            &self.params,
            &self.request,
            context,
            &self.output_dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::PresetLibrary;

    fn store() -> OverrideStore {
        OverrideStore::default()
    }

    #[test]
    fn test_resolve_preset_defaults() {
        let library = PresetLibrary::builtin();
        let preset = library.get("pretrain-19b").unwrap();
        let cfg =
            JobConfiguration::resolve("pretrain-19b", preset, &store(), &KnobOverrides::default())
                .unwrap();

        assert_eq!(cfg.topology.node_count, 32);
        assert_eq!(cfg.plan.gradient_accumulation_steps, 1);
        assert_eq!(cfg.master_port, DEFAULT_MASTER_PORT);
        assert_eq!(cfg.output_dir, PathBuf::from("work_dirs/pretrain_19b"));
    }

    #[test]
    fn test_flag_overrides_win() {
        let library = PresetLibrary::builtin();
        let preset = library.get("finetune-2b").unwrap();
        let knobs = KnobOverrides {
            gpus: Some(16),
            batch_size: Some(256),
            partition: Some("debug".to_string()),
            output_dir: Some("work_dirs/scratch".to_string()),
            ..KnobOverrides::default()
        };
        let cfg = JobConfiguration::resolve("finetune-2b", preset, &store(), &knobs).unwrap();

        assert_eq!(cfg.topology.gpu_total, 16);
        assert_eq!(cfg.topology.node_count, 2);
        assert_eq!(cfg.request.partition, "debug");
        assert_eq!(cfg.output_dir, PathBuf::from("work_dirs/scratch"));
    }

    #[test]
    fn test_env_overrides_beat_preset() {
        let library = PresetLibrary::builtin();
        let preset = library.get("finetune-2b").unwrap();
        let env = OverrideStore::from_pairs([("GPUS", "16"), ("BATCH_SIZE", "512")]);
        let cfg =
            JobConfiguration::resolve("finetune-2b", preset, &env, &KnobOverrides::default())
                .unwrap();

        assert_eq!(cfg.topology.gpu_total, 16);
        assert_eq!(cfg.plan.global_batch_size, 512);
        assert_eq!(cfg.plan.gradient_accumulation_steps, 8);
    }

    #[test]
    fn test_inconsistent_override_combination_fails() {
        let library = PresetLibrary::builtin();
        let preset = library.get("finetune-19b").unwrap();
        // 512 % (5 * 128) != 0
        let knobs = KnobOverrides {
            batch_size: Some(512),
            per_device_batch_size: Some(5),
            ..KnobOverrides::default()
        };
        assert!(JobConfiguration::resolve("finetune-19b", preset, &store(), &knobs).is_err());
    }

    #[test]
    fn test_invocation_round_trip_is_stable() {
        let library = PresetLibrary::builtin();
        let preset = library.get("finetune-19b").unwrap();
        let cfg =
            JobConfiguration::resolve("finetune-19b", preset, &store(), &KnobOverrides::default())
                .unwrap();
        let context = LaunchContext::new("/repo", cfg.master_port);
        assert_eq!(
            cfg.build_invocation(&context).command_line(),
            cfg.build_invocation(&context).command_line()
        );
    }
}
