//! Named experiment presets.
//!
//! The original launch workflow was one shell script per experiment,
//! each differing only in literal parameter values. Presets replace
//! that: a built-in table of the script families at their published
//! scales, plus an optional user TOML file whose entries shadow
//! built-ins by name.

use crate::error::{LaunchError, Result};
use crate::params::TrainingParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One experiment: knob defaults plus the driver parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub description: String,
    pub gpus: u64,
    pub gpus_per_node: u64,
    pub batch_size: u64,
    pub per_device_batch_size: u64,
    pub cpus_per_task: u64,
    pub output_dir: String,
    pub params: TrainingParameters,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            description: String::new(),
            gpus: 8,
            gpus_per_node: 8,
            batch_size: 128,
            per_device_batch_size: 4,
            cpus_per_task: 10,
            output_dir: "work_dirs/default".to_string(),
            params: TrainingParameters::default(),
        }
    }
}

/// On-disk shape of a user preset file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: BTreeMap<String, Preset>,
}

/// All presets visible to one launch: built-ins, optionally shadowed
/// by a user file.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: BTreeMap<String, Preset>,
}

impl PresetLibrary {
    /// The built-in experiment table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut presets = BTreeMap::new();

        presets.insert(
            "pretrain-19b".to_string(),
            Preset {
                description: "Stage-1 pretrain, 19B, 256 GPUs".to_string(),
                gpus: 256,
                gpus_per_node: 8,
                batch_size: 2048,
                per_device_batch_size: 8,
                cpus_per_task: 10,
                output_dir: "work_dirs/pretrain_19b".to_string(),
                params: TrainingParameters {
                    script: "internvl/train/internvl_chat_pretrain.py".to_string(),
                    vision_path: Some("pretrained/intern_vit_6b".to_string()),
                    llm_path: Some("pretrained/internlm2_chat_20b".to_string()),
                    meta_path: "shell/data/pretrain_meta.json".to_string(),
                    freeze_backbone: false,
                    freeze_llm: true,
                    freeze_mlp: false,
                    drop_path_rate: 0.1,
                    learning_rate: 2e-5,
                    save_steps: 400,
                    save_total_limit: 3,
                    ..TrainingParameters::default()
                },
            },
        );

        presets.insert(
            "pretrain-19b-large".to_string(),
            Preset {
                description: "Stage-1 pretrain, 19B, 512 GPUs".to_string(),
                gpus: 512,
                gpus_per_node: 8,
                batch_size: 4096,
                per_device_batch_size: 8,
                cpus_per_task: 10,
                output_dir: "work_dirs/pretrain_19b_large".to_string(),
                params: TrainingParameters {
                    script: "internvl/train/internvl_chat_pretrain.py".to_string(),
                    vision_path: Some("pretrained/intern_vit_6b".to_string()),
                    llm_path: Some("pretrained/internlm2_chat_20b".to_string()),
                    meta_path: "shell/data/pretrain_meta.json".to_string(),
                    freeze_backbone: false,
                    freeze_llm: true,
                    freeze_mlp: false,
                    drop_path_rate: 0.1,
                    learning_rate: 2e-5,
                    save_steps: 400,
                    save_total_limit: 3,
                    ..TrainingParameters::default()
                },
            },
        );

        presets.insert(
            "finetune-19b".to_string(),
            Preset {
                description: "Full finetune, 19B, 128 GPUs".to_string(),
                gpus: 128,
                gpus_per_node: 8,
                batch_size: 1024,
                per_device_batch_size: 8,
                cpus_per_task: 10,
                output_dir: "work_dirs/finetune_19b".to_string(),
                params: TrainingParameters {
                    model_path: Some("work_dirs/pretrain_19b".to_string()),
                    meta_path: "shell/data/finetune_meta.json".to_string(),
                    freeze_backbone: true,
                    freeze_llm: false,
                    freeze_mlp: false,
                    learning_rate: 4e-5,
                    ..TrainingParameters::default()
                },
            },
        );

        presets.insert(
            "finetune-2b".to_string(),
            Preset {
                description: "Full finetune, 2B, single node".to_string(),
                gpus: 8,
                gpus_per_node: 8,
                batch_size: 128,
                per_device_batch_size: 4,
                cpus_per_task: 10,
                output_dir: "work_dirs/finetune_2b".to_string(),
                params: TrainingParameters {
                    model_path: Some("pretrained/internvl_chat_2b".to_string()),
                    meta_path: "shell/data/finetune_meta.json".to_string(),
                    learning_rate: 4e-5,
                    max_seq_length: 8192,
                    ..TrainingParameters::default()
                },
            },
        );

        Self { presets }
    }

    /// Built-ins plus a user preset file; file entries shadow
    /// built-ins with the same name.
    pub fn with_file(path: &Path) -> Result<Self> {
        let mut library = Self::builtin();
        let contents = std::fs::read_to_string(path)?;
        let file: PresetFile = toml::from_str(&contents).map_err(|e| {
            LaunchError::Configuration(format!("invalid preset file {}: {e}", path.display()))
        })?;
        library.presets.extend(file.presets);
        Ok(library)
    }

    pub fn get(&self, name: &str) -> Result<&Preset> {
        self.presets.get(name).ok_or_else(|| {
            let known = self.names().join(", ");
            LaunchError::Configuration(format!("unknown preset {name:?}; known presets: {known}"))
        })
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.presets.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_presets_resolve_cleanly() {
        let library = PresetLibrary::builtin();
        for (name, preset) in library.iter() {
            let resolved = crate::topology::resolve(
                preset.gpus,
                preset.gpus_per_node,
                preset.batch_size,
                preset.per_device_batch_size,
                preset.cpus_per_task,
            );
            assert!(resolved.is_ok(), "builtin preset {name} does not resolve");
        }
    }

    #[test]
    fn test_unknown_preset_names_alternatives() {
        let library = PresetLibrary::builtin();
        let err = library.get("nope").unwrap_err();
        assert!(err.to_string().contains("finetune-2b"));
    }

    #[test]
    fn test_user_file_shadows_builtin() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("presets.toml");
        std::fs::write(
            &path,
            r#"
[presets.finetune-2b]
description = "local variant"
gpus = 16
batch_size = 256

[presets.ablation-1]
description = "new experiment"
gpus = 32
batch_size = 512
per_device_batch_size = 8
output_dir = "work_dirs/ablation_1"
"#,
        )
        .unwrap();

        let library = PresetLibrary::with_file(&path).unwrap();
        assert_eq!(library.get("finetune-2b").unwrap().gpus, 16);
        assert_eq!(library.get("ablation-1").unwrap().batch_size, 512);
        // Untouched built-ins survive.
        assert!(library.get("pretrain-19b").is_ok());
    }

    #[test]
    fn test_malformed_user_file_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("presets.toml");
        std::fs::write(&path, "presets = 3").unwrap();

        let err = PresetLibrary::with_file(&path).unwrap_err();
        match err {
            LaunchError::Configuration(msg) => assert!(msg.contains("presets.toml")),
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }
}
