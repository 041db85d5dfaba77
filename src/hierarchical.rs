//! Hierarchical normal model for comparing the means of many groups.

use rand::Rng;
use statrs::function::gamma::ln_gamma;

use crate::{
    data::GroupedData,
    distributions,
    error::{GibbsError, Result},
    math,
    model::{
        check_initial_location, check_initial_variance, checked_location, checked_variance,
        normal_posterior, GibbsModel, ParameterVector,
    },
    settings::{HierarchicalPriors, VarianceHyperprior, VarianceModel},
    trace::Trace,
};

/// Current values of all parameters of a [`HierarchicalModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalState {
    /// Group means.
    pub theta: Box<[f64]>,
    /// Within-group variances. One value if the variance is shared,
    /// otherwise one value per group.
    pub sigma2: Box<[f64]>,
    /// Population mean.
    pub mu: f64,
    /// Between-group variance.
    pub tau2: f64,
    /// Random prior scale of the group variances, if it has a hyperprior.
    pub sigma0_sq: Option<f64>,
    /// Random prior degrees of freedom of the group variances, if it has
    /// a hyperprior.
    pub nu0: Option<f64>,
}

impl HierarchicalState {
    /// Within-group variance used by group `j`.
    pub fn sigma2_of(&self, j: usize) -> f64 {
        if self.sigma2.len() == 1 {
            self.sigma2[0]
        } else {
            self.sigma2[j]
        }
    }

    /// Average within-group variance.
    pub fn mean_sigma2(&self) -> f64 {
        math::mean(&self.sigma2)
    }

    /// Share of the total variance that is between groups,
    /// `tau2 / (tau2 + sigma2)`.
    pub fn variance_ratio(&self) -> f64 {
        self.tau2 / (self.tau2 + self.mean_sigma2())
    }
}

impl ParameterVector for HierarchicalState {
    fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.theta.len() + self.sigma2.len() + 4);
        names.extend((0..self.theta.len()).map(|j| format!("theta[{}]", j)));
        if self.sigma2.len() == 1 {
            names.push("sigma2".to_string());
        } else {
            names.extend((0..self.sigma2.len()).map(|j| format!("sigma2[{}]", j)));
        }
        names.push("mu".to_string());
        names.push("tau2".to_string());
        if self.sigma0_sq.is_some() {
            names.push("sigma0_sq".to_string());
        }
        if self.nu0.is_some() {
            names.push("nu0".to_string());
        }
        names
    }

    fn write_values(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&self.theta);
        out.extend_from_slice(&self.sigma2);
        out.push(self.mu);
        out.push(self.tau2);
        out.extend(self.sigma0_sq);
        out.extend(self.nu0);
    }
}

/// Group means drawn from a common normal population
///
/// ```text
/// y_ij ~ N(theta_j, sigma2_j)
/// theta_j ~ N(mu, tau2)
/// ```
///
/// with conjugate priors on `mu`, `tau2` and the within-group variances.
/// The variance is either shared by all groups or group specific.
#[derive(Debug, Clone)]
pub struct HierarchicalModel {
    data: GroupedData,
    priors: HierarchicalPriors,
    variance: VarianceModel,
    hyperprior: Option<VarianceHyperprior>,
}

impl HierarchicalModel {
    pub fn new(
        data: GroupedData,
        priors: HierarchicalPriors,
        variance: VarianceModel,
    ) -> Result<Self> {
        priors.validate()?;
        Ok(HierarchicalModel {
            data,
            priors,
            variance,
            hyperprior: None,
        })
    }

    /// Put hyperpriors on `sigma0_sq` and `nu0`.
    ///
    /// Requires group specific variances.
    pub fn with_hyperprior(mut self, hyperprior: VarianceHyperprior) -> Result<Self> {
        hyperprior.validate()?;
        if self.variance != VarianceModel::PerGroup {
            return Err(GibbsError::InvalidModel(
                "a variance hyperprior needs group specific variances".into(),
            ));
        }
        self.hyperprior = Some(hyperprior);
        Ok(self)
    }

    pub fn data(&self) -> &GroupedData {
        &self.data
    }

    pub fn priors(&self) -> &HierarchicalPriors {
        &self.priors
    }

    fn num_variances(&self) -> usize {
        match self.variance {
            VarianceModel::Shared => 1,
            VarianceModel::PerGroup => self.data.num_groups(),
        }
    }

    /// Draw `sigma0_sq` and then `nu0` from their full conditionals.
    fn sweep_variance_prior<R: Rng + ?Sized>(
        &self,
        hyper: &VarianceHyperprior,
        state: &mut HierarchicalState,
        draw: u64,
        rng: &mut R,
    ) -> Result<()> {
        let m = state.sigma2.len() as f64;
        let sum_prec: f64 = state.sigma2.iter().map(|s| 1. / s).sum();
        let sum_log_prec: f64 = state.sigma2.iter().map(|s| -s.ln()).sum();

        let nu0 = state.nu0.unwrap_or(self.priors.nu0);
        let shape = hyper.a + m * nu0 / 2.;
        let rate = hyper.b + nu0 * sum_prec / 2.;
        let sigma0_sq = checked_variance(
            "sigma0_sq",
            draw,
            distributions::gamma(rng, shape, rate)?,
        )?;
        state.sigma0_sq = Some(sigma0_sq);

        let log_weights: Vec<f64> = (1..=hyper.nu_max)
            .map(|k| {
                let nu = k as f64;
                m * nu / 2. * (nu * sigma0_sq / 2.).ln() - m * ln_gamma(nu / 2.)
                    + (nu / 2. - 1.) * sum_log_prec
                    - nu * (hyper.alpha + sigma0_sq * sum_prec / 2.)
            })
            .collect();
        let idx = distributions::categorical_log(rng, &log_weights)?;
        state.nu0 = Some((idx + 1) as f64);
        Ok(())
    }

    /// Draw a mean and an observation for a new group, once per draw of
    /// the trace.
    ///
    /// With group specific variances the variance of the new group is
    /// drawn from its prior given the current `nu0` and `sigma0_sq`.
    pub fn predict_new_group<R: Rng + ?Sized>(
        &self,
        trace: &Trace<HierarchicalState>,
        rng: &mut R,
    ) -> Result<Vec<(f64, f64)>> {
        trace
            .draws
            .iter()
            .map(|state| {
                let theta = distributions::normal(rng, state.mu, state.tau2)?;
                let sigma2 = match self.variance {
                    VarianceModel::Shared => state.sigma2[0],
                    VarianceModel::PerGroup => {
                        let nu0 = state.nu0.unwrap_or(self.priors.nu0);
                        let sigma0_sq = state.sigma0_sq.unwrap_or(self.priors.sigma0_sq);
                        distributions::inv_gamma(rng, nu0 / 2., nu0 * sigma0_sq / 2.)?
                    }
                };
                let y = distributions::normal(rng, theta, sigma2)?;
                Ok((theta, y))
            })
            .collect()
    }
}

impl GibbsModel for HierarchicalModel {
    type State = HierarchicalState;

    fn init_state(&self) -> HierarchicalState {
        let theta = self.data.means();
        let pooled = self.data.pooled_variance().unwrap_or(self.priors.sigma0_sq);
        let sigma2 = match self.variance {
            VarianceModel::Shared => vec![pooled],
            VarianceModel::PerGroup => self
                .data
                .summaries()
                .iter()
                .map(|s| s.variance().filter(|&v| v > 0.).unwrap_or(pooled))
                .collect(),
        };
        let sigma2 = sigma2
            .into_iter()
            .map(|v| if v > 0. { v } else { self.priors.sigma0_sq })
            .collect();

        let mu = math::mean(&theta);
        let tau2 = math::variance(&theta);
        let tau2 = if tau2 > 0. { tau2 } else { self.priors.tau0_sq };

        let (sigma0_sq, nu0) = match self.hyperprior {
            Some(_) => (Some(self.priors.sigma0_sq), Some(self.priors.nu0)),
            None => (None, None),
        };

        HierarchicalState {
            theta: theta.into(),
            sigma2,
            mu,
            tau2,
            sigma0_sq,
            nu0,
        }
    }

    fn check_state(&self, state: &HierarchicalState) -> Result<()> {
        let m = self.data.num_groups();
        if state.theta.len() != m {
            return Err(GibbsError::InvalidInitialState(format!(
                "expected {} group means, got {}",
                m,
                state.theta.len()
            )));
        }
        if state.sigma2.len() != self.num_variances() {
            return Err(GibbsError::InvalidInitialState(format!(
                "expected {} within-group variances, got {}",
                self.num_variances(),
                state.sigma2.len()
            )));
        }
        if state.sigma0_sq.is_some() != self.hyperprior.is_some()
            || state.nu0.is_some() != self.hyperprior.is_some()
        {
            return Err(GibbsError::InvalidInitialState(
                "sigma0_sq and nu0 must be set exactly when the model has a variance hyperprior"
                    .into(),
            ));
        }
        for &theta in state.theta.iter() {
            check_initial_location("theta", theta)?;
        }
        for &sigma2 in state.sigma2.iter() {
            check_initial_variance("sigma2", sigma2)?;
        }
        check_initial_location("mu", state.mu)?;
        check_initial_variance("tau2", state.tau2)?;
        if let Some(sigma0_sq) = state.sigma0_sq {
            check_initial_variance("sigma0_sq", sigma0_sq)?;
        }
        if let Some(nu0) = state.nu0 {
            check_initial_variance("nu0", nu0)?;
        }
        Ok(())
    }

    fn sweep<R: Rng + ?Sized>(
        &self,
        state: &mut HierarchicalState,
        draw: u64,
        rng: &mut R,
    ) -> Result<()> {
        let summaries = self.data.summaries();
        let m = summaries.len() as f64;
        let priors = &self.priors;

        // theta_j | mu, tau2, sigma2_j
        for (j, group) in summaries.iter().enumerate() {
            let precision = group.n as f64 / state.sigma2_of(j);
            let (mean, var) = normal_posterior(state.mu, state.tau2, group.mean, precision);
            state.theta[j] = checked_location("theta", draw, distributions::normal(rng, mean, var)?)?;
        }

        // sigma2 | theta (this sweep), nu0, sigma0_sq
        let nu0 = state.nu0.unwrap_or(priors.nu0);
        let sigma0_sq = state.sigma0_sq.unwrap_or(priors.sigma0_sq);
        match self.variance {
            VarianceModel::Shared => {
                let n = self.data.num_observations() as f64;
                let ss: f64 = summaries
                    .iter()
                    .zip(state.theta.iter())
                    .map(|(group, &theta)| group.sum_sq_resid(theta))
                    .sum();
                let value = distributions::inv_gamma(
                    rng,
                    (nu0 + n) / 2.,
                    (nu0 * sigma0_sq + ss) / 2.,
                )?;
                state.sigma2[0] = checked_variance("sigma2", draw, value)?;
            }
            VarianceModel::PerGroup => {
                for (j, group) in summaries.iter().enumerate() {
                    let value = distributions::inv_gamma(
                        rng,
                        (nu0 + group.n as f64) / 2.,
                        (nu0 * sigma0_sq + group.sum_sq_resid(state.theta[j])) / 2.,
                    )?;
                    state.sigma2[j] = checked_variance("sigma2", draw, value)?;
                }
            }
        }

        // sigma0_sq, nu0 | sigma2 (this sweep)
        if let Some(hyper) = &self.hyperprior {
            self.sweep_variance_prior(hyper, state, draw, rng)?;
        }

        // mu | theta (this sweep), tau2
        let theta_bar = math::mean(&state.theta);
        let (mean, var) = normal_posterior(priors.mu0, priors.gamma0_sq, theta_bar, m / state.tau2);
        state.mu = checked_location("mu", draw, distributions::normal(rng, mean, var)?)?;

        // tau2 | theta, mu (this sweep)
        let ss: f64 = state
            .theta
            .iter()
            .map(|theta| (theta - state.mu) * (theta - state.mu))
            .sum();
        let value = distributions::inv_gamma(
            rng,
            (priors.eta0 + m) / 2.,
            (priors.eta0 * priors.tau0_sq + ss) / 2.,
        )?;
        state.tau2 = checked_variance("tau2", draw, value)?;
        Ok(())
    }
}

impl Trace<HierarchicalState> {
    /// `tau2 / (tau2 + sigma2)` for every draw.
    pub fn variance_ratio(&self) -> Vec<f64> {
        self.derived(|s| s.variance_ratio())
    }

    /// Posterior probability that group `j` has a larger mean than group `k`.
    ///
    /// `None` for an empty trace or a group index out of range.
    pub fn prob_greater(&self, j: usize, k: usize) -> Option<f64> {
        let num_groups = self.draws.first()?.theta.len();
        if j >= num_groups || k >= num_groups {
            return None;
        }
        self.probability(|s| s.theta[j] > s.theta[k])
    }
}
