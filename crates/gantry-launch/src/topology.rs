//! Resource allocation resolution.
//!
//! Turns the four independent knobs (total GPUs, GPUs per node, global
//! batch size, per-device batch size) into a node/task topology and a
//! gradient-accumulation plan, rejecting any combination that does not
//! divide exactly.

use crate::error::{LaunchError, Result};
use serde::{Deserialize, Serialize};

/// Node/task topology derived from the GPU knobs. Immutable once
/// computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTopology {
    pub gpu_total: u64,
    pub gpus_per_node: u64,
    pub node_count: u64,
    /// One task per GPU.
    pub task_count: u64,
    pub tasks_per_node: u64,
    pub cpus_per_task: u64,
}

/// Batch-size plan derived from the batch knobs and the topology.
/// Invariant: `gradient_accumulation_steps * per_device_batch_size *
/// gpu_total == global_batch_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub global_batch_size: u64,
    pub per_device_batch_size: u64,
    pub gradient_accumulation_steps: u64,
}

/// Resolve the topology and batch plan from the raw knobs.
///
/// Divisibility is validated, never truncated: a global batch size
/// that is not an exact multiple of `per_device_batch_size * gpu_total`
/// would silently change the effective batch size if rounded, so it is
/// rejected instead.
pub fn resolve(
    gpu_total: u64,
    gpus_per_node: u64,
    global_batch_size: u64,
    per_device_batch_size: u64,
    cpus_per_task: u64,
) -> Result<(JobTopology, BatchPlan)> {
    for (name, value) in [
        ("gpus", gpu_total),
        ("gpus-per-node", gpus_per_node),
        ("batch-size", global_batch_size),
        ("per-device-batch-size", per_device_batch_size),
        ("cpus-per-task", cpus_per_task),
    ] {
        if value == 0 {
            return Err(LaunchError::Configuration(format!("{name} must be >= 1")));
        }
    }

    if gpu_total % gpus_per_node != 0 {
        return Err(LaunchError::Configuration(format!(
            "gpu total ({gpu_total}) is not divisible by gpus per node ({gpus_per_node})"
        )));
    }
    let node_count = gpu_total / gpus_per_node;

    let per_step = per_device_batch_size * gpu_total;
    if global_batch_size % per_step != 0 {
        return Err(LaunchError::Configuration(format!(
            "global batch size {global_batch_size} is not achievable with per-device batch size \
             {per_device_batch_size} on {gpu_total} GPUs ({global_batch_size} % {per_step} != 0); \
             accumulation steps would be truncated"
        )));
    }
    let gradient_accumulation_steps = global_batch_size / per_step;

    let topology = JobTopology {
        gpu_total,
        gpus_per_node,
        node_count,
        task_count: gpu_total,
        tasks_per_node: gpus_per_node,
        cpus_per_task,
    };
    let plan = BatchPlan {
        global_batch_size,
        per_device_batch_size,
        gradient_accumulation_steps,
    };
    Ok((topology, plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pretrain_scale() {
        // 256 GPUs across 8-GPU nodes, global batch 2048.
        let (topo, plan) = resolve(256, 8, 2048, 8, 10).unwrap();
        assert_eq!(topo.node_count, 32);
        assert_eq!(topo.task_count, 256);
        assert_eq!(topo.tasks_per_node, 8);
        assert_eq!(plan.gradient_accumulation_steps, 1);
    }

    #[test]
    fn test_resolve_large_pretrain_scale() {
        let (topo, plan) = resolve(512, 8, 4096, 8, 10).unwrap();
        assert_eq!(topo.node_count, 64);
        assert_eq!(plan.gradient_accumulation_steps, 1);
    }

    #[test]
    fn test_resolve_with_accumulation() {
        let (_, plan) = resolve(8, 8, 512, 4, 10).unwrap();
        assert_eq!(plan.gradient_accumulation_steps, 16);
        assert_eq!(
            plan.gradient_accumulation_steps * plan.per_device_batch_size * 8,
            plan.global_batch_size
        );
    }

    #[test]
    fn test_non_divisible_nodes_rejected() {
        let err = resolve(12, 8, 96, 1, 10).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("8"));
    }

    #[test]
    fn test_non_divisible_batch_rejected_not_truncated() {
        // 512 % (5 * 128) != 0; truncation would give 0 steps.
        let err = resolve(128, 8, 512, 5, 10).unwrap_err();
        match err {
            LaunchError::Configuration(msg) => {
                assert!(msg.contains("512"));
                assert!(msg.contains("5"));
                assert!(msg.contains("128"));
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_knob_rejected() {
        assert!(resolve(0, 8, 128, 4, 10).is_err());
        assert!(resolve(8, 8, 0, 4, 10).is_err());
    }
}
