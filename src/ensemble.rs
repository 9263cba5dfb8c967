use lazy_static::*;

use anyhow::ensure;
use tch::{Device, Kind, Tensor};

pub mod helpers;
pub mod member;
pub mod uncertainty;

use member::StochasticSegmenter;
use uncertainty::{UncertaintyAccumulator, UncertaintyMaps};

lazy_static! {
    pub static ref DEVICE: Device = {
        if tch::Cuda::is_available() {
            log::info!("Using GPU");
            Device::Cuda(0)
        } else {
            log::info!("Using CPU");
            Device::Cpu
        }
    };
}

/// Runs every member `passes` times on a batch and turns the outputs into uncertainty maps.
pub struct EnsembleEvaluator<S> {
    members: Vec<S>,
    passes: usize,
    num_classes: i64,
}

impl<S: StochasticSegmenter> EnsembleEvaluator<S> {
    pub fn new(members: Vec<S>, passes: usize, num_classes: i64) -> Result<EnsembleEvaluator<S>, anyhow::Error> {
        ensure!(!members.is_empty(), "the ensemble needs at least one member");
        ensure!(passes >= 1, "passes must be at least 1");
        Ok(EnsembleEvaluator {
            members,
            passes,
            num_classes,
        })
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Softmax of one member averaged over its passes, upsampled to the input resolution.
    /// Returns (B, C, H, W) Float.
    pub fn member_mean_probabilities(&self, member: &S, images: &Tensor) -> Result<Tensor, anyhow::Error> {
        let (batch, _, height, width) = images.size4()?;
        let mut mean = Tensor::zeros([batch, self.num_classes, height, width], (Kind::Float, images.device()));
        for _ in 0..self.passes {
            let logits = member.logits(images)?;
            let (out_batch, classes, out_height, out_width) = logits.size4()?;
            ensure!(
                out_batch == batch && classes == self.num_classes,
                "member returned logits of shape {:?}, expected ({}, {}, _, _)",
                logits.size(),
                batch,
                self.num_classes
            );
            let logits = if (out_height, out_width) == (height, width) {
                logits
            } else {
                logits.upsample_bilinear2d([height, width], true, None::<f64>, None::<f64>)
            };
            mean += logits.softmax(1, Kind::Float) / self.passes as f64;
        }
        Ok(mean)
    }

    /// `images` is a (B, 3, H, W) normalized batch already on the members' device
    pub fn evaluate_batch(&self, images: &Tensor) -> Result<UncertaintyMaps, anyhow::Error> {
        tch::no_grad(|| {
            let mut accumulator = UncertaintyAccumulator::new(self.members.len(), self.num_classes);
            for member in &self.members {
                let mean = self.member_mean_probabilities(member, images)?;
                accumulator.add_member(&mean)?;
            }
            accumulator.finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Returns ln(p) for a fixed list of per pass distributions, cycling through them.
    /// Output is at half resolution when `half` is set.
    struct ScriptedMember {
        passes: Vec<Vec<f64>>,
        calls: Cell<usize>,
        half: bool,
    }

    impl ScriptedMember {
        fn new(passes: &[&[f64]]) -> ScriptedMember {
            ScriptedMember {
                passes: passes.iter().map(|p| p.to_vec()).collect(),
                calls: Cell::new(0),
                half: false,
            }
        }
    }

    impl StochasticSegmenter for ScriptedMember {
        fn logits(&self, images: &Tensor) -> Result<Tensor, anyhow::Error> {
            let (batch, _, height, width) = images.size4()?;
            let (height, width) = if self.half { (height / 2, width / 2) } else { (height, width) };
            let probs = &self.passes[self.calls.get() % self.passes.len()];
            self.calls.set(self.calls.get() + 1);
            let classes = probs.len() as i64;
            let logits = Tensor::from_slice(probs)
                .log()
                .to_kind(Kind::Float)
                .view([1, classes, 1, 1])
                .expand([batch, classes, height, width], false)
                .contiguous();
            Ok(logits)
        }
    }

    fn images(height: i64, width: i64) -> Tensor {
        Tensor::zeros([1, 3, height, width], (Kind::Float, Device::Cpu))
    }

    #[test]
    fn two_passes_three_members_reference() {
        let members = vec![
            ScriptedMember::new(&[&[0.8, 0.2], &[0.6, 0.4]]),
            ScriptedMember::new(&[&[0.5, 0.5]]),
            ScriptedMember::new(&[&[0.9, 0.1]]),
        ];
        let evaluator = EnsembleEvaluator::new(members, 2, 2).unwrap();
        let maps = evaluator.evaluate_batch(&images(2, 3)).unwrap();
        assert_eq!(maps.entropy.size(), vec![1, 2, 3]);
        // float32 softmax limits the precision
        assert!((maps.mean_probs.double_value(&[0, 0, 1, 2]) - 0.700001).abs() < 1e-6);
        assert!((maps.mean_probs.double_value(&[0, 1, 0, 0]) - 0.300001).abs() < 1e-6);
        let expected_hp = [0.2036212875667536, 0.2310488556174355, 0.10836112711050044];
        for (n, want) in expected_hp.iter().enumerate() {
            let got = maps.member_entropies.double_value(&[n as i64, 0, 1, 1]);
            assert!((got - want).abs() < 1e-5, "member {}: {} vs {}", n, got, want);
        }
        assert!((maps.entropy.double_value(&[0, 0, 0]) - 0.5430312702946896).abs() < 1e-5);
        assert!((maps.hentropy.double_value(&[0, 1, 2]) - 0.9033870522941285).abs() < 1e-5);
        assert_eq!(maps.prediction.int64_value(&[0, 1, 1]), 0);
    }

    #[test]
    fn every_member_runs_every_pass() {
        let members = vec![ScriptedMember::new(&[&[0.5, 0.5]]), ScriptedMember::new(&[&[0.5, 0.5]])];
        let evaluator = EnsembleEvaluator::new(members, 3, 2).unwrap();
        evaluator.evaluate_batch(&images(1, 1)).unwrap();
        for member in &evaluator.members {
            assert_eq!(member.calls.get(), 3);
        }
    }

    #[test]
    fn low_resolution_logits_are_upsampled() {
        let mut member = ScriptedMember::new(&[&[0.25, 0.25, 0.5]]);
        member.half = true;
        let evaluator = EnsembleEvaluator::new(vec![member], 1, 3).unwrap();
        let maps = evaluator.evaluate_batch(&images(4, 6)).unwrap();
        assert_eq!(maps.prediction.size(), vec![1, 4, 6]);
        assert_eq!(maps.mean_probs.size(), vec![1, 3, 4, 6]);
        assert_eq!(maps.prediction.int64_value(&[0, 3, 5]), 2);
    }

    #[test]
    fn wrong_class_count_is_an_error() {
        let evaluator = EnsembleEvaluator::new(vec![ScriptedMember::new(&[&[0.5, 0.5]])], 1, 19).unwrap();
        assert!(evaluator.evaluate_batch(&images(2, 2)).is_err());
        assert!(EnsembleEvaluator::<ScriptedMember>::new(vec![], 1, 19).is_err());
    }
}
