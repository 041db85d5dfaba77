use crate::error::{GibbsError, Result};

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0. && value.is_finite() {
        Ok(())
    } else {
        Err(GibbsError::InvalidHyperparameter { name, value })
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GibbsError::InvalidHyperparameter { name, value })
    }
}

/// Prior hyperparameters of the hierarchical normal model
///
/// ```text
/// y_ij ~ N(theta_j, sigma2_j)
/// theta_j ~ N(mu, tau2)
/// mu ~ N(mu0, gamma0_sq)
/// tau2 ~ IG(eta0 / 2, eta0 * tau0_sq / 2)
/// sigma2_j ~ IG(nu0 / 2, nu0 * sigma0_sq / 2)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchicalPriors {
    pub mu0: f64,
    pub gamma0_sq: f64,
    pub eta0: f64,
    pub tau0_sq: f64,
    pub nu0: f64,
    pub sigma0_sq: f64,
}

impl Default for HierarchicalPriors {
    fn default() -> Self {
        Self {
            mu0: 50.,
            gamma0_sq: 25.,
            eta0: 1.,
            tau0_sq: 100.,
            nu0: 1.,
            sigma0_sq: 100.,
        }
    }
}

impl HierarchicalPriors {
    pub fn validate(&self) -> Result<()> {
        check_finite("mu0", self.mu0)?;
        check_positive("gamma0_sq", self.gamma0_sq)?;
        check_positive("eta0", self.eta0)?;
        check_positive("tau0_sq", self.tau0_sq)?;
        check_positive("nu0", self.nu0)?;
        check_positive("sigma0_sq", self.sigma0_sq)?;
        Ok(())
    }
}

/// Prior hyperparameters of the two group comparison
///
/// ```text
/// y_i1 = mu + delta + eps_i1
/// y_i2 = mu - delta + eps_i2
/// eps ~ N(0, sigma2)
/// mu ~ N(mu0, gamma0_sq)
/// delta ~ N(delta0, tau0_sq)
/// sigma2 ~ IG(nu0 / 2, nu0 * sigma0_sq / 2)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoGroupPriors {
    pub mu0: f64,
    pub gamma0_sq: f64,
    pub delta0: f64,
    pub tau0_sq: f64,
    pub nu0: f64,
    pub sigma0_sq: f64,
}

impl Default for TwoGroupPriors {
    fn default() -> Self {
        Self {
            mu0: 50.,
            gamma0_sq: 625.,
            delta0: 0.,
            tau0_sq: 625.,
            nu0: 1.,
            sigma0_sq: 100.,
        }
    }
}

impl TwoGroupPriors {
    pub fn validate(&self) -> Result<()> {
        check_finite("mu0", self.mu0)?;
        check_positive("gamma0_sq", self.gamma0_sq)?;
        check_finite("delta0", self.delta0)?;
        check_positive("tau0_sq", self.tau0_sq)?;
        check_positive("nu0", self.nu0)?;
        check_positive("sigma0_sq", self.sigma0_sq)?;
        Ok(())
    }
}

/// Whether all groups share one within-group variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarianceModel {
    #[default]
    Shared,
    PerGroup,
}

/// Hyperpriors on the parameters of the within-group variance prior.
///
/// Only used with [`VarianceModel::PerGroup`]. With this enabled `sigma0_sq`
/// and `nu0` become random:
///
/// ```text
/// sigma0_sq ~ Gamma(a, rate = b)
/// p(nu0) ∝ exp(-alpha * nu0),  nu0 in 1..=nu_max
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceHyperprior {
    pub a: f64,
    pub b: f64,
    pub alpha: f64,
    pub nu_max: u32,
}

impl Default for VarianceHyperprior {
    fn default() -> Self {
        Self {
            a: 1.,
            b: 1. / 100.,
            alpha: 1.,
            nu_max: 5000,
        }
    }
}

impl VarianceHyperprior {
    pub fn validate(&self) -> Result<()> {
        check_positive("a", self.a)?;
        check_positive("b", self.b)?;
        check_positive("alpha", self.alpha)?;
        if self.nu_max == 0 {
            return Err(GibbsError::InvalidHyperparameter {
                name: "nu_max",
                value: 0.,
            });
        }
        Ok(())
    }
}

/// Settings for running one or more Gibbs chains.
#[derive(Debug, Clone, Copy)]
pub struct GibbsSettings {
    /// The number of draws stored per chain.
    pub num_draws: u64,
    /// The number of independent chains for parallel sampling.
    pub num_chains: usize,
    pub seed: u64,
}

impl Default for GibbsSettings {
    fn default() -> Self {
        Self {
            num_draws: 5000,
            num_chains: 4,
            seed: 0,
        }
    }
}

impl GibbsSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_draws == 0 {
            return Err(GibbsError::InvalidChainLength);
        }
        if self.num_chains == 0 {
            return Err(GibbsError::InvalidModel("at least one chain is needed".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        HierarchicalPriors::default().validate().unwrap();
        TwoGroupPriors::default().validate().unwrap();
        VarianceHyperprior::default().validate().unwrap();
        GibbsSettings::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_variances() {
        let priors = HierarchicalPriors {
            tau0_sq: 0.,
            ..Default::default()
        };
        assert_eq!(
            priors.validate().unwrap_err(),
            GibbsError::InvalidHyperparameter {
                name: "tau0_sq",
                value: 0.
            }
        );

        let priors = TwoGroupPriors {
            nu0: -1.,
            ..Default::default()
        };
        assert!(priors.validate().is_err());

        let priors = HierarchicalPriors {
            mu0: f64::NAN,
            ..Default::default()
        };
        assert!(priors.validate().is_err());

        let settings = GibbsSettings {
            num_draws: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            GibbsError::InvalidChainLength
        );
    }
}
