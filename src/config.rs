use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Everything the sequence evaluation needs to know. Every field has a default, so a JSON file
/// only has to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub model_id: String,
    /// Indices of the ensemble members, one checkpoint each
    pub members: Vec<u32>,
    /// Stochastic forward passes per member
    pub passes: usize,
    pub batch_size: usize,
    pub num_classes: i64,
    pub data_dir: PathBuf,
    pub sequences: Vec<String>,
    pub output_root: PathBuf,
    /// Placeholders: {model_id}, {member}, {step}
    pub checkpoint_template: String,
    pub checkpoint_step: u32,
    pub fps: u32,
    /// Weight of the camera image in the prediction overlay
    pub overlay_alpha: f32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            model_id: "mcdropout".to_string(),
            members: vec![0, 1, 2, 3],
            passes: 8,
            batch_size: 6,
            num_classes: 19,
            data_dir: PathBuf::from("./data/cityscapes"),
            sequences: vec!["00".to_string()],
            output_root: PathBuf::from("./training_logs"),
            checkpoint_template: "./trained_models/{model_id}_{member}/checkpoint_{step}.pt"
                .to_string(),
            checkpoint_step: 20000,
            fps: 20,
            overlay_alpha: 0.30,
        }
    }
}

impl EvalConfig {
    pub fn from_json_file<T: AsRef<Path>>(path: T) -> Result<EvalConfig, anyhow::Error> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("cannot open config file {}", path.display()))?;
        let config: EvalConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(!self.members.is_empty(), "the ensemble needs at least one member");
        ensure!(self.passes >= 1, "passes must be at least 1, got {}", self.passes);
        ensure!(self.batch_size >= 1, "batch_size must be at least 1");
        ensure!(
            self.num_classes >= 2,
            "num_classes must be at least 2, got {}",
            self.num_classes
        );
        ensure!(self.fps >= 1, "fps must be at least 1");
        ensure!(
            (0.0..=1.0).contains(&self.overlay_alpha),
            "overlay_alpha must be in [0, 1], got {}",
            self.overlay_alpha
        );
        ensure!(
            self.checkpoint_template.contains("{member}"),
            "checkpoint_template must contain {{member}}: {}",
            self.checkpoint_template
        );
        Ok(())
    }

    pub fn checkpoint_path(&self, member: u32) -> PathBuf {
        PathBuf::from(
            self.checkpoint_template
                .replace("{model_id}", &self.model_id)
                .replace("{member}", &member.to_string())
                .replace("{step}", &self.checkpoint_step.to_string()),
        )
    }

    /// `<output_root>/<model_id>_M<passes>_N<members>_eval_seq`
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(format!(
            "{}_M{}_N{}_eval_seq",
            self.model_id,
            self.passes,
            self.members.len()
        ))
    }

    pub fn sequence_dir(&self, sequence: &str) -> PathBuf {
        self.output_dir().join(sequence)
    }

    /// ln(num_classes), the entropy of a uniform prediction
    pub fn max_entropy(&self) -> f64 {
        (self.num_classes as f64).ln()
    }
}
