//! Invocation building.
//!
//! Composes the scheduler resource request and the training-driver
//! argument list into one launchable command. Building is pure and
//! deterministic: identical inputs always yield a byte-identical
//! command line, so a printed plan is a faithful audit record of what
//! `launch` would run.

use crate::params::TrainingParameters;
use crate::topology::{BatchPlan, JobTopology};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable names set on the launched process.
pub const ENV_PYTHONPATH: &str = "PYTHONPATH";
pub const ENV_MASTER_PORT: &str = "MASTER_PORT";

/// Scheduler-level knobs not derived from the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRequest {
    /// Scheduler submit binary, resolved on PATH.
    pub scheduler: String,
    pub partition: String,
    pub quota_type: String,
    /// Ask the scheduler to terminate the whole job when any one task
    /// fails. A request to the scheduler, not logic implemented here.
    pub kill_on_bad_exit: bool,
    /// Free-form extra scheduler arguments, appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for SchedulerRequest {
    fn default() -> Self {
        Self {
            scheduler: "srun".to_string(),
            partition: "gpu".to_string(),
            quota_type: "reserved".to_string(),
            kill_on_bad_exit: true,
            extra_args: Vec::new(),
        }
    }
}

/// The two process-wide environment values consumed by the launched
/// job: the module search path and the distributed-rendezvous port.
/// Captured once at process start, never mutated mid-launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchContext {
    /// Final PYTHONPATH value for the child process.
    pub python_path: String,
    /// Rendezvous port for distributed workers.
    pub master_port: u16,
}

impl LaunchContext {
    /// Build a context from explicit values (tests, presets).
    #[must_use]
    pub fn new(python_path: impl Into<String>, master_port: u16) -> Self {
        Self { python_path: python_path.into(), master_port }
    }

    /// Capture the context from the invoking process: the working
    /// directory is prepended to any inherited PYTHONPATH so the
    /// training driver resolves the local package tree first.
    pub fn capture(master_port: u16) -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let python_path = match std::env::var(ENV_PYTHONPATH) {
            Ok(existing) if !existing.is_empty() => {
                format!("{}:{existing}", cwd.display())
            }
            _ => cwd.display().to_string(),
        };
        Ok(Self { python_path, master_port })
    }
}

/// A fully-built, launchable command. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Environment set on the child, in addition to the inherited one.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Compose the scheduler resource request (one field per topology
    /// entry) and the training-driver command into a single
    /// invocation. Pure; nothing is executed.
    #[must_use]
    pub fn build(
        topology: &JobTopology,
        plan: &BatchPlan,
        params: &TrainingParameters,
        request: &SchedulerRequest,
        context: &LaunchContext,
        output_dir: &Path,
    ) -> Self {
        let mut args = vec![
            "-p".to_string(),
            request.partition.clone(),
            format!("--gres=gpu:{}", topology.gpus_per_node),
            format!("--nodes={}", topology.node_count),
            format!("--ntasks={}", topology.task_count),
            format!("--ntasks-per-node={}", topology.tasks_per_node),
            format!("--cpus-per-task={}", topology.cpus_per_task),
            format!("--quotatype={}", request.quota_type),
        ];
        if request.kill_on_bad_exit {
            args.push("--kill-on-bad-exit=1".to_string());
        }
        args.extend(request.extra_args.iter().cloned());

        args.push("python".to_string());
        args.push("-u".to_string());
        args.push(params.script.clone());
        args.extend(params.to_args(output_dir, plan));

        Self {
            program: request.scheduler.clone(),
            args,
            env: vec![
                (ENV_PYTHONPATH.to_string(), context.python_path.clone()),
                (ENV_MASTER_PORT.to_string(), context.master_port.to_string()),
            ],
        }
    }

    /// Render the invocation as a single display line (plan output and
    /// log header). Not shell-quoted; display only.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::resolve;
    use std::path::PathBuf;

    fn fixture() -> (JobTopology, BatchPlan) {
        resolve(256, 8, 2048, 8, 10).unwrap()
    }

    #[test]
    fn test_build_maps_topology_one_to_one() {
        let (topo, plan) = fixture();
        let inv = Invocation::build(
            &topo,
            &plan,
            &TrainingParameters::default(),
            &SchedulerRequest::default(),
            &LaunchContext::new(".", 29500),
            &PathBuf::from("work_dirs/exp"),
        );

        assert_eq!(inv.program, "srun");
        assert!(inv.args.contains(&"--gres=gpu:8".to_string()));
        assert!(inv.args.contains(&"--nodes=32".to_string()));
        assert!(inv.args.contains(&"--ntasks=256".to_string()));
        assert!(inv.args.contains(&"--ntasks-per-node=8".to_string()));
        assert!(inv.args.contains(&"--cpus-per-task=10".to_string()));
        assert!(inv.args.contains(&"--kill-on-bad-exit=1".to_string()));
    }

    #[test]
    fn test_build_is_deterministic() {
        let (topo, plan) = fixture();
        let params = TrainingParameters::default();
        let request = SchedulerRequest::default();
        let context = LaunchContext::new("/repo", 29500);
        let out = PathBuf::from("work_dirs/exp");

        let a = Invocation::build(&topo, &plan, &params, &request, &context, &out);
        let b = Invocation::build(&topo, &plan, &params, &request, &context, &out);
        assert_eq!(a, b);
        assert_eq!(a.command_line(), b.command_line());
    }

    #[test]
    fn test_extra_scheduler_args_precede_driver() {
        let (topo, plan) = fixture();
        let request = SchedulerRequest {
            extra_args: vec!["--async".to_string()],
            ..SchedulerRequest::default()
        };
        let inv = Invocation::build(
            &topo,
            &plan,
            &TrainingParameters::default(),
            &request,
            &LaunchContext::new(".", 29500),
            &PathBuf::from("out"),
        );

        let extra = inv.args.iter().position(|a| a == "--async").unwrap();
        let python = inv.args.iter().position(|a| a == "python").unwrap();
        assert!(extra < python);
    }

    #[test]
    fn test_env_carries_context() {
        let (topo, plan) = fixture();
        let inv = Invocation::build(
            &topo,
            &plan,
            &TrainingParameters::default(),
            &SchedulerRequest::default(),
            &LaunchContext::new("/repo:/site-packages", 34229),
            &PathBuf::from("out"),
        );
        assert!(inv.env.contains(&(ENV_PYTHONPATH.to_string(), "/repo:/site-packages".to_string())));
        assert!(inv.env.contains(&(ENV_MASTER_PORT.to_string(), "34229".to_string())));
    }

    #[test]
    fn test_kill_on_bad_exit_is_optional() {
        let (topo, plan) = fixture();
        let request = SchedulerRequest { kill_on_bad_exit: false, ..SchedulerRequest::default() };
        let inv = Invocation::build(
            &topo,
            &plan,
            &TrainingParameters::default(),
            &request,
            &LaunchContext::new(".", 29500),
            &PathBuf::from("out"),
        );
        assert!(!inv.args.iter().any(|a| a.starts_with("--kill-on-bad-exit")));
    }
}
