use crate::config::EvalConfig;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tch::{CModule, Device, Tensor};

/// One member of the ensemble. Every call to `logits` is one stochastic forward pass, so two
/// calls with the same input may return different logits.
pub trait StochasticSegmenter {
    /// (B, 3, H, W) normalized images in, (B, C, h, w) logits out. The output may be smaller
    /// than the input, the evaluator upsamples it.
    fn logits(&self, images: &Tensor) -> Result<Tensor, anyhow::Error>;
}

/// A network exported with TorchScript whose dropout layers stay active in eval mode.
pub struct TorchScriptMember {
    module: CModule,
    path: PathBuf,
}

impl TorchScriptMember {
    pub fn load<T: AsRef<Path>>(path: T, device: Device) -> Result<TorchScriptMember, anyhow::Error> {
        let path = path.as_ref();
        let mut module = CModule::load_on_device(path, device)
            .with_context(|| format!("cannot load checkpoint {}", path.display()))?;
        module.set_eval();
        Ok(TorchScriptMember {
            module,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StochasticSegmenter for TorchScriptMember {
    fn logits(&self, images: &Tensor) -> Result<Tensor, anyhow::Error> {
        let logits = self
            .module
            .forward_ts(&[images])
            .with_context(|| format!("forward pass of {} failed", self.path.display()))?;
        Ok(logits)
    }
}

/// Loads the checkpoint of every member listed in the config, in order
pub fn load_members(config: &EvalConfig, device: Device) -> Result<Vec<TorchScriptMember>, anyhow::Error> {
    config
        .members
        .iter()
        .map(|&member| {
            let path = config.checkpoint_path(member);
            log::info!("Loading member {} from {}", member, path.display());
            TorchScriptMember::load(path, device)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EvalConfig::default();
        config.checkpoint_template = dir
            .path()
            .join("{model_id}_{member}.pt")
            .to_string_lossy()
            .to_string();
        config.members = vec![3];
        let err = load_members(&config, Device::Cpu).err().unwrap();
        assert!(format!("{:#}", err).contains("mcdropout_3.pt"));
    }
}
