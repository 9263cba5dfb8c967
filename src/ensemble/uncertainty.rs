use anyhow::{ensure, Context};
use tch::{Kind, Tensor};

/// Added to every mean probability before taking logs
pub const PROBABILITY_EPSILON: f64 = 1e-6;

/// Per pixel outputs of the ensemble for one batch
#[derive(Debug)]
pub struct UncertaintyMaps {
    /// (B, H, W) Int64, argmax of `mean_probs`
    pub prediction: Tensor,
    /// (B, C, H, W) Double, average over members of their epsilon-shifted mean distributions
    pub mean_probs: Tensor,
    /// (B, H, W) Double, average entropy of the members
    pub entropy: Tensor,
    /// (B, H, W) Double, entropy of the per member entropy contributions
    pub hentropy: Tensor,
    /// (N, B, H, W) Double, entropy of member n divided by N
    pub member_entropies: Tensor,
    pub num_classes: i64,
}

impl UncertaintyMaps {
    /// Entropy divided by ln(num_classes), 0 for a certain prediction and about 1 for a uniform one
    pub fn normalized_entropy(&self) -> Tensor {
        &self.entropy / (self.num_classes as f64).ln()
    }

    pub fn batch_size(&self) -> i64 {
        self.entropy.size()[0]
    }
}

/// Collects the mean class distribution of every ensemble member and splits the uncertainty into
/// the average member entropy and the entropy of the member contributions.
///
/// The second term treats the N values `H(p_n) / N` as if they were a distribution and takes
/// their entropy. It is not the mutual information between prediction and model, it is kept as
/// is because the published uncertainty maps were produced with it.
pub struct UncertaintyAccumulator {
    num_members: usize,
    num_classes: i64,
    exp_pred: Option<Tensor>,
    member_entropies: Vec<Tensor>,
}

impl UncertaintyAccumulator {
    pub fn new(num_members: usize, num_classes: i64) -> UncertaintyAccumulator {
        UncertaintyAccumulator {
            num_members,
            num_classes,
            exp_pred: None,
            member_entropies: Vec::with_capacity(num_members),
        }
    }

    /// `mean_probs` is the (B, C, H, W) distribution of one member averaged over its passes
    pub fn add_member(&mut self, mean_probs: &Tensor) -> Result<(), anyhow::Error> {
        let (_, classes, _, _) = mean_probs.size4()?;
        ensure!(
            classes == self.num_classes,
            "member produced {} classes, expected {}",
            classes,
            self.num_classes
        );
        ensure!(
            self.member_entropies.len() < self.num_members,
            "already got {} members",
            self.num_members
        );
        let n = self.num_members as f64;
        let p = mean_probs.to_kind(Kind::Double) + PROBABILITY_EPSILON;

        let contribution = &p / n;
        self.exp_pred = Some(match self.exp_pred.take() {
            None => contribution,
            Some(exp_pred) => {
                ensure!(
                    exp_pred.size() == contribution.size(),
                    "member output {:?} does not match {:?}",
                    contribution.size(),
                    exp_pred.size()
                );
                exp_pred + contribution
            }
        });

        let entropy = -(&p * p.log()).sum_dim_intlist([1], false, Kind::Double);
        self.member_entropies.push(entropy / n);
        Ok(())
    }

    pub fn finish(self) -> Result<UncertaintyMaps, anyhow::Error> {
        ensure!(
            self.member_entropies.len() == self.num_members,
            "got {} members, expected {}",
            self.member_entropies.len(),
            self.num_members
        );
        let mean_probs = self.exp_pred.context("no member was added")?;
        let hp = Tensor::stack(&self.member_entropies, 0);
        let entropy = hp.sum_dim_intlist([0], false, Kind::Double);
        let hentropy = -(&hp * hp.log()).sum_dim_intlist([0], false, Kind::Double);
        Ok(UncertaintyMaps {
            prediction: mean_probs.argmax(1, false),
            mean_probs,
            entropy,
            hentropy,
            member_entropies: hp,
            num_classes: self.num_classes,
        })
    }
}
