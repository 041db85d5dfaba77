//! Comparison of two group means through their average and half difference.

use rand::Rng;

use crate::{
    data::GroupedData,
    distributions,
    error::{GibbsError, Result},
    model::{
        check_initial_location, check_initial_variance, checked_location, checked_variance,
        normal_posterior, GibbsModel, ParameterVector,
    },
    settings::TwoGroupPriors,
    trace::Trace,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoGroupState {
    /// Average of the two group means.
    pub mu: f64,
    /// Half the difference between the group means.
    pub delta: f64,
    /// Shared within-group variance.
    pub sigma2: f64,
}

impl TwoGroupState {
    pub fn theta1(&self) -> f64 {
        self.mu + self.delta
    }

    pub fn theta2(&self) -> f64 {
        self.mu - self.delta
    }
}

impl ParameterVector for TwoGroupState {
    fn names(&self) -> Vec<String> {
        vec!["mu".to_string(), "delta".to_string(), "sigma2".to_string()]
    }

    fn write_values(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&[self.mu, self.delta, self.sigma2]);
    }
}

/// Two groups with means `mu + delta` and `mu - delta` and a common variance.
///
/// The first group in id order is group 1.
#[derive(Debug, Clone)]
pub struct TwoGroupModel {
    data: GroupedData,
    priors: TwoGroupPriors,
}

impl TwoGroupModel {
    pub fn new(data: GroupedData, priors: TwoGroupPriors) -> Result<Self> {
        if data.num_groups() != 2 {
            return Err(GibbsError::InvalidModel(format!(
                "the two group model needs exactly two groups, got {}",
                data.num_groups()
            )));
        }
        priors.validate()?;
        Ok(TwoGroupModel { data, priors })
    }

    pub fn data(&self) -> &GroupedData {
        &self.data
    }

    /// Draw one new observation for each group per draw of the trace.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        trace: &Trace<TwoGroupState>,
        rng: &mut R,
    ) -> Result<Vec<(f64, f64)>> {
        trace
            .draws
            .iter()
            .map(|s| {
                let y1 = distributions::normal(rng, s.theta1(), s.sigma2)?;
                let y2 = distributions::normal(rng, s.theta2(), s.sigma2)?;
                Ok((y1, y2))
            })
            .collect()
    }
}

impl GibbsModel for TwoGroupModel {
    type State = TwoGroupState;

    fn init_state(&self) -> TwoGroupState {
        let [g1, g2] = [self.data.summaries()[0], self.data.summaries()[1]];
        let sigma2 = self
            .data
            .pooled_variance()
            .filter(|&v| v > 0.)
            .unwrap_or(self.priors.sigma0_sq);
        TwoGroupState {
            mu: (g1.mean + g2.mean) / 2.,
            delta: (g1.mean - g2.mean) / 2.,
            sigma2,
        }
    }

    fn check_state(&self, state: &TwoGroupState) -> Result<()> {
        check_initial_location("mu", state.mu)?;
        check_initial_location("delta", state.delta)?;
        check_initial_variance("sigma2", state.sigma2)?;
        Ok(())
    }

    fn sweep<R: Rng + ?Sized>(&self, state: &mut TwoGroupState, draw: u64, rng: &mut R) -> Result<()> {
        let [g1, g2] = [self.data.summaries()[0], self.data.summaries()[1]];
        let (n1, n2) = (g1.n as f64, g2.n as f64);
        let n = n1 + n2;
        let priors = &self.priors;

        // sigma2 | mu, delta
        let ss = g1.sum_sq_resid(state.theta1()) + g2.sum_sq_resid(state.theta2());
        let value = distributions::inv_gamma(
            rng,
            (priors.nu0 + n) / 2.,
            (priors.nu0 * priors.sigma0_sq + ss) / 2.,
        )?;
        state.sigma2 = checked_variance("sigma2", draw, value)?;

        // mu | delta, sigma2 (this sweep)
        let data_mean = (n1 * (g1.mean - state.delta) + n2 * (g2.mean + state.delta)) / n;
        let (mean, var) = normal_posterior(priors.mu0, priors.gamma0_sq, data_mean, n / state.sigma2);
        state.mu = checked_location("mu", draw, distributions::normal(rng, mean, var)?)?;

        // delta | mu, sigma2 (this sweep)
        let data_mean = (n1 * (g1.mean - state.mu) - n2 * (g2.mean - state.mu)) / n;
        let (mean, var) =
            normal_posterior(priors.delta0, priors.tau0_sq, data_mean, n / state.sigma2);
        state.delta = checked_location("delta", draw, distributions::normal(rng, mean, var)?)?;
        Ok(())
    }
}

impl Trace<TwoGroupState> {
    /// Posterior probability that the first group has the larger mean.
    pub fn prob_delta_positive(&self) -> Option<f64> {
        self.probability(|s| s.delta > 0.)
    }
}
