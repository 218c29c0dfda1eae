//! Training-driver parameters.
//!
//! A typed record of the driver flags Gantry understands, plus an open
//! extension map for driver-specific flags it forwards verbatim. The
//! core never interprets values; it only renders them. The two fields
//! it *does* own — `per_device_train_batch_size` and
//! `gradient_accumulation_steps` — are always taken from the validated
//! [`BatchPlan`], never from a caller-supplied entry.

use crate::topology::BatchPlan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Numeric precision mode requested from the training driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    Bf16,
    Fp16,
    Fp32,
}

/// Parameters forwarded to the training driver as `--name value`
/// pairs. Defaults follow the finetune script family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParameters {
    /// Path to the training driver script.
    pub script: String,
    /// Combined model checkpoint to start from, if any.
    pub model_path: Option<String>,
    /// Vision tower to start from (pretrain-style runs).
    pub vision_path: Option<String>,
    /// Language model to start from (pretrain-style runs).
    pub llm_path: Option<String>,
    /// Conversation template tag.
    pub conv_style: String,
    /// Dataset manifest path.
    pub meta_path: String,
    pub force_image_size: u64,
    pub max_dynamic_patch: u64,
    pub down_sample_ratio: f64,
    pub drop_path_rate: f64,
    pub freeze_backbone: bool,
    pub freeze_llm: bool,
    pub freeze_mlp: bool,
    pub vision_select_layer: i64,
    pub learning_rate: f64,
    pub lr_scheduler_type: String,
    pub warmup_ratio: f64,
    pub weight_decay: f64,
    pub num_train_epochs: f64,
    pub max_seq_length: u64,
    pub save_steps: u64,
    pub save_total_limit: u64,
    pub logging_steps: u64,
    pub dataloader_num_workers: u64,
    pub grad_checkpoint: bool,
    pub dynamic_image_size: bool,
    pub use_thumbnail: bool,
    pub precision: Precision,
    /// Metric reporting sink tag (e.g. "tensorboard", "none").
    pub report_to: String,
    /// Driver flags the core does not interpret, forwarded verbatim.
    /// Sorted map, so rendering stays deterministic.
    pub extra: BTreeMap<String, String>,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            script: "internvl/train/internvl_chat_finetune.py".to_string(),
            model_path: None,
            vision_path: None,
            llm_path: None,
            conv_style: "internlm2-chat".to_string(),
            meta_path: "shell/data/meta.json".to_string(),
            force_image_size: 448,
            max_dynamic_patch: 6,
            down_sample_ratio: 0.5,
            drop_path_rate: 0.0,
            freeze_backbone: true,
            freeze_llm: false,
            freeze_mlp: false,
            vision_select_layer: -1,
            learning_rate: 4e-5,
            lr_scheduler_type: "cosine".to_string(),
            warmup_ratio: 0.03,
            weight_decay: 0.01,
            num_train_epochs: 1.0,
            max_seq_length: 4096,
            save_steps: 200,
            save_total_limit: 1,
            logging_steps: 1,
            dataloader_num_workers: 4,
            grad_checkpoint: true,
            dynamic_image_size: true,
            use_thumbnail: true,
            precision: Precision::Bf16,
            report_to: "tensorboard".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// The two flags owned by the batch plan; same-named extension entries
/// are dropped so a stale override can never disagree with the
/// validated plan.
const PLAN_OWNED_FLAGS: [&str; 2] = ["per_device_train_batch_size", "gradient_accumulation_steps"];

impl TrainingParameters {
    /// Render the full `--name value` argument list for the training
    /// driver, in a stable order: declared fields first, then the
    /// extension map (already sorted). Same inputs always produce the
    /// same list.
    #[must_use]
    pub fn to_args(&self, output_dir: &Path, plan: &BatchPlan) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |name: &str, value: String| {
            args.push(format!("--{name}"));
            args.push(value);
        };

        if let Some(p) = &self.model_path {
            push("model_name_or_path", p.clone());
        }
        if let Some(p) = &self.vision_path {
            push("vision_path", p.clone());
        }
        if let Some(p) = &self.llm_path {
            push("llm_path", p.clone());
        }
        push("conv_style", self.conv_style.clone());
        push("output_dir", output_dir.display().to_string());
        push("meta_path", self.meta_path.clone());
        push("overwrite_output_dir", render_bool(true));
        push("force_image_size", self.force_image_size.to_string());
        push("max_dynamic_patch", self.max_dynamic_patch.to_string());
        push("down_sample_ratio", render_float(self.down_sample_ratio));
        push("drop_path_rate", render_float(self.drop_path_rate));
        push("freeze_backbone", render_bool(self.freeze_backbone));
        push("freeze_llm", render_bool(self.freeze_llm));
        push("freeze_mlp", render_bool(self.freeze_mlp));
        push("vision_select_layer", self.vision_select_layer.to_string());
        push("dataloader_num_workers", self.dataloader_num_workers.to_string());
        push(match self.precision {
            Precision::Bf16 => "bf16",
            Precision::Fp16 => "fp16",
            Precision::Fp32 => "fp32",
        }, render_bool(true));
        push("num_train_epochs", render_float(self.num_train_epochs));
        push("per_device_train_batch_size", plan.per_device_batch_size.to_string());
        push("gradient_accumulation_steps", plan.gradient_accumulation_steps.to_string());
        push("learning_rate", render_float(self.learning_rate));
        push("lr_scheduler_type", self.lr_scheduler_type.clone());
        push("warmup_ratio", render_float(self.warmup_ratio));
        push("weight_decay", render_float(self.weight_decay));
        push("max_seq_length", self.max_seq_length.to_string());
        push("save_strategy", "steps".to_string());
        push("save_steps", self.save_steps.to_string());
        push("save_total_limit", self.save_total_limit.to_string());
        push("logging_steps", self.logging_steps.to_string());
        push("grad_checkpoint", render_bool(self.grad_checkpoint));
        push("dynamic_image_size", render_bool(self.dynamic_image_size));
        push("use_thumbnail", render_bool(self.use_thumbnail));
        push("do_train", render_bool(true));
        push("report_to", self.report_to.clone());

        for (name, value) in &self.extra {
            if PLAN_OWNED_FLAGS.contains(&name.as_str()) {
                continue;
            }
            push(name, value.clone());
        }

        args
    }
}

/// Bools are rendered the way the training driver's argument parser
/// expects them.
fn render_bool(v: bool) -> String {
    if v { "True".to_string() } else { "False".to_string() }
}

/// Plain decimal rendering; `{}` on f64 is stable for a given value,
/// which is all determinism needs.
fn render_float(v: f64) -> String {
    format!("{v}")
}
