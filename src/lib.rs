//! Gibbs samplers for normal models that compare group means.
//!
//! The two group model describes both means through their average `mu`
//! and half difference `delta`. The hierarchical model draws the means of
//! any number of groups from a common normal population, with either a
//! shared or group specific within-group variance.
//!
//! ```no_run
//! use hiernorm_rs::{run, GibbsModel, GroupedData, HierarchicalModel, HierarchicalPriors, VarianceModel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let data = GroupedData::from_groups(vec![vec![48., 52., 50.], vec![40., 45., 42.]])?;
//! let model = HierarchicalModel::new(data, HierarchicalPriors::default(), VarianceModel::Shared)?;
//! let mut rng = StdRng::seed_from_u64(42);
//! let trace = run(&model, model.init_state(), 5000, &mut rng)?;
//! let shrunk = trace.mean("theta[1]");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub(crate) mod chain;
pub(crate) mod data;
pub mod distributions;
pub(crate) mod error;
pub(crate) mod hierarchical;
pub(crate) mod math;
pub(crate) mod model;
pub(crate) mod sampler;
pub(crate) mod settings;
pub(crate) mod trace;
pub(crate) mod two_group;

pub use chain::{GibbsChain, Progress};
pub use data::{GroupSummary, GroupedData};
pub use error::{GibbsError, SamplingFailure};
pub use hierarchical::{HierarchicalModel, HierarchicalState};
pub use model::{GibbsModel, ParameterVector};
pub use sampler::{run, sample_parallel, sample_sequentially};
pub use settings::{
    GibbsSettings, HierarchicalPriors, TwoGroupPriors, VarianceHyperprior, VarianceModel,
};
pub use trace::{MultiTrace, Trace};
pub use two_group::{TwoGroupModel, TwoGroupState};
