//! Core abstractions for Gibbs samplers.
//!
//! A model owns the data and the prior, a state holds the current value
//! of every unknown. Each call to [`GibbsModel::sweep`] replaces every
//! parameter by a draw from its full conditional.

use std::fmt::Debug;

use rand::Rng;

use crate::error::{GibbsError, Result};

/// A snapshot of all parameters of a model.
pub trait ParameterVector: Clone + Debug + Send + Sync + 'static {
    /// Names of the scalar parameters, in the order of `write_values`.
    fn names(&self) -> Vec<String>;

    /// Append the values of all parameters to `out`.
    fn write_values(&self, out: &mut Vec<f64>);
}

/// A model whose full conditionals can all be sampled directly.
///
/// Implementations must update the state in place, one parameter at a
/// time. A draw later in the sweep always conditions on the values that
/// were drawn earlier in the same sweep, and on the previous sweep for
/// everything that has not been updated yet.
pub trait GibbsModel: Sync {
    type State: ParameterVector;

    /// A starting point derived from the data.
    fn init_state(&self) -> Self::State;

    /// Check that a state has the right shape and valid values for this model.
    fn check_state(&self, state: &Self::State) -> Result<()>;

    /// Perform one full sweep over all parameters.
    ///
    /// `draw` is only used to report errors.
    fn sweep<R: Rng + ?Sized>(&self, state: &mut Self::State, draw: u64, rng: &mut R)
        -> Result<()>;
}

/// Posterior of a normal mean with known data precision.
///
/// Combines the prior `N(prior_mean, prior_var)` with a data mean whose
/// precision is `data_precision`. Returns mean and variance.
pub(crate) fn normal_posterior(
    prior_mean: f64,
    prior_var: f64,
    data_mean: f64,
    data_precision: f64,
) -> (f64, f64) {
    let prior_precision = 1. / prior_var;
    let var = 1. / (prior_precision + data_precision);
    let mean = var * (prior_mean * prior_precision + data_mean * data_precision);
    (mean, var)
}

pub(crate) fn checked_location(param: &'static str, draw: u64, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GibbsError::NonFinite { param, draw, value })
    }
}

pub(crate) fn checked_variance(param: &'static str, draw: u64, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(GibbsError::NonFinite { param, draw, value })
    }
}

pub(crate) fn check_initial_variance(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(GibbsError::InvalidInitialState(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

pub(crate) fn check_initial_location(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GibbsError::InvalidInitialState(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
pub mod test_models {
    //! Small models for testing the sampling machinery.

    use rand::Rng;

    use super::{GibbsModel, ParameterVector};
    use crate::error::{GibbsError, Result};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Counter {
        pub value: f64,
    }

    impl ParameterVector for Counter {
        fn names(&self) -> Vec<String> {
            vec!["value".to_string()]
        }

        fn write_values(&self, out: &mut Vec<f64>) {
            out.push(self.value);
        }
    }

    /// Adds a uniform draw to the value and fails at `fail_at`.
    pub struct FailingWalk {
        pub fail_at: Option<u64>,
    }

    impl GibbsModel for FailingWalk {
        type State = Counter;

        fn init_state(&self) -> Counter {
            Counter { value: 0. }
        }

        fn check_state(&self, state: &Counter) -> Result<()> {
            if state.value.is_finite() {
                Ok(())
            } else {
                Err(GibbsError::InvalidInitialState("value".into()))
            }
        }

        fn sweep<R: Rng + ?Sized>(&self, state: &mut Counter, draw: u64, rng: &mut R) -> Result<()> {
            if Some(draw) == self.fail_at {
                return Err(GibbsError::NonFinite {
                    param: "value",
                    draw,
                    value: f64::NAN,
                });
            }
            state.value += rng.random::<f64>();
            Ok(())
        }
    }
}
