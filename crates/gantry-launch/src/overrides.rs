//! Parameter override resolution.
//!
//! Every launch knob resolves through the same precedence chain:
//!
//! 1. CLI flag (handled by the caller, passed in as `Option`)
//! 2. Process environment variable
//! 3. Preset default
//!
//! An unset *or empty* value at one layer falls through to the next —
//! `GPUS= gantry launch ...` behaves exactly like leaving `GPUS`
//! unset. No validation happens here beyond numeric parsing; the
//! resolver owns the cross-knob invariants.

use crate::error::{LaunchError, Result};
use std::collections::HashMap;

/// Environment variable names consulted for each knob.
pub const ENV_GPUS: &str = "GPUS";
pub const ENV_GPUS_PER_NODE: &str = "GPUS_PER_NODE";
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub const ENV_PER_DEVICE_BATCH_SIZE: &str = "PER_DEVICE_BATCH_SIZE";
pub const ENV_PARTITION: &str = "PARTITION";
pub const ENV_QUOTA_TYPE: &str = "QUOTA_TYPE";
pub const ENV_CPUS_PER_TASK: &str = "CPUS_PER_TASK";
pub const ENV_MASTER_PORT: &str = "MASTER_PORT";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";

/// Snapshot of the override environment, taken once per launch.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    values: HashMap<String, String>,
}

impl OverrideStore {
    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self { values: std::env::vars().collect() }
    }

    /// Build a store from explicit pairs (used by tests and preset
    /// files; no process state involved).
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Raw lookup. Empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    /// Resolve a string knob: flag, else env, else default.
    #[must_use]
    pub fn resolve_str(&self, flag: Option<&str>, env_name: &str, default: &str) -> String {
        flag.filter(|v| !v.trim().is_empty())
            .or_else(|| self.get(env_name))
            .unwrap_or(default)
            .to_string()
    }

    /// Resolve a numeric knob. A non-numeric environment override is a
    /// configuration error naming the knob and the offending text.
    pub fn resolve_u64(&self, flag: Option<u64>, env_name: &str, default: u64) -> Result<u64> {
        if let Some(v) = flag {
            return Ok(v);
        }
        match self.get(env_name) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                LaunchError::Configuration(format!(
                    "{env_name} must be a positive integer, got {raw:?}"
                ))
            }),
            None => Ok(default),
        }
    }

    pub fn resolve_u16(&self, flag: Option<u16>, env_name: &str, default: u16) -> Result<u16> {
        let v = self.resolve_u64(flag.map(u64::from), env_name, u64::from(default))?;
        u16::try_from(v).map_err(|_| {
            LaunchError::Configuration(format!("{env_name} must fit in 16 bits, got {v}"))
        })
    }
}
