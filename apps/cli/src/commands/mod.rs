//! Command implementations for the Gantry CLI.

pub mod launch;
pub mod plan;
pub mod presets;

use anyhow::{Context, Result};
use gantry_launch::PresetLibrary;
use std::path::Path;

/// Load the preset library, merging a user file over the built-ins
/// when one is given.
pub fn load_library(preset_file: Option<&Path>) -> Result<PresetLibrary> {
    match preset_file {
        Some(path) => PresetLibrary::with_file(path)
            .with_context(|| format!("Failed to load preset file {}", path.display())),
        None => Ok(PresetLibrary::builtin()),
    }
}
