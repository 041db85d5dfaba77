use thiserror::Error;

use crate::trace::Trace;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GibbsError {
    #[error("The observation set contains no groups")]
    NoGroups,
    #[error("Group {group} has no observations")]
    EmptyGroup { group: u64 },
    #[error("Observation {index} of group {group} is not finite")]
    NonFiniteObservation { group: u64, index: usize },
    #[error("Hyperparameter {name} is invalid: {value}")]
    InvalidHyperparameter { name: &'static str, value: f64 },
    #[error("The number of draws must be positive")]
    InvalidChainLength,
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Invalid initial state: {0}")]
    InvalidInitialState(String),
    #[error("Could not construct {name} distribution: {message}")]
    Distribution { name: &'static str, message: String },
    #[error("Draw of {param} in iteration {draw} is not a valid value: {value}")]
    NonFinite {
        param: &'static str,
        draw: u64,
        value: f64,
    },
}

impl GibbsError {
    /// Configuration errors are detected before the first sweep, all
    /// other errors happen while sampling.
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            GibbsError::NonFinite { .. } | GibbsError::Distribution { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GibbsError>;

/// The error returned by [`crate::run`].
///
/// `partial` holds every draw that finished before the failure. It is
/// `None` if the configuration was rejected before sampling started.
#[derive(Error, Debug)]
#[error(
    "Sampling failed after {} draws: {error}",
    .partial.as_ref().map_or(0, |t| t.len())
)]
pub struct SamplingFailure<S> {
    #[source]
    pub error: GibbsError,
    pub partial: Option<Trace<S>>,
}

impl<S> SamplingFailure<S> {
    pub(crate) fn config(error: GibbsError) -> Self {
        SamplingFailure {
            error,
            partial: None,
        }
    }
}
