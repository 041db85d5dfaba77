use anyhow::Context;
use itertools::Itertools;
use log::{debug, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::{prelude::*, ThreadPoolBuilder};

use crate::{
    chain::{GibbsChain, Progress},
    error::{GibbsError, Result, SamplingFailure},
    model::GibbsModel,
    settings::GibbsSettings,
    trace::{MultiTrace, Trace},
};

/// Run a single chain for `num_draws` sweeps, starting at `initial`.
///
/// The random source is used directly, so the same seed and the same
/// inputs give the same trace. Invalid input is rejected before the first
/// sweep. If a draw fails the error is returned together with all draws
/// that finished before it.
pub fn run<M: GibbsModel, R: Rng + ?Sized>(
    model: &M,
    initial: M::State,
    num_draws: u64,
    rng: &mut R,
) -> std::result::Result<Trace<M::State>, SamplingFailure<M::State>> {
    run_chain(model, initial, num_draws, 0, rng)
}

fn run_chain<M: GibbsModel, R: Rng + ?Sized>(
    model: &M,
    initial: M::State,
    num_draws: u64,
    chain_id: u64,
    rng: &mut R,
) -> std::result::Result<Trace<M::State>, SamplingFailure<M::State>> {
    if num_draws == 0 {
        return Err(SamplingFailure::config(GibbsError::InvalidChainLength));
    }
    let mut chain = GibbsChain::new(model, rng, chain_id);
    chain.set_state(initial).map_err(SamplingFailure::config)?;

    debug!("Starting chain {} with {} draws", chain_id, num_draws);
    let mut trace = Trace::with_capacity(chain_id, num_draws as usize);
    for _ in 0..num_draws {
        match chain.draw() {
            Ok((state, _)) => trace.draws.push(state),
            Err(error) => {
                warn!(
                    "Chain {} stopped after {} draws: {}",
                    chain_id,
                    trace.len(),
                    error
                );
                return Err(SamplingFailure {
                    error,
                    partial: Some(trace),
                });
            }
        }
    }
    debug!("Finished chain {}", chain_id);
    Ok(trace)
}

/// Lazily draw from a single chain.
///
/// The chain gets its own generator seeded from `rng`. Dropping the
/// iterator stops sampling. Zero draws or an invalid initial state are
/// rejected before the first sweep.
pub fn sample_sequentially<'model, M: GibbsModel, R: Rng>(
    model: &'model M,
    initial: M::State,
    draws: u64,
    chain: u64,
    rng: &mut R,
) -> Result<impl Iterator<Item = Result<(M::State, Progress)>> + 'model> {
    if draws == 0 {
        return Err(GibbsError::InvalidChainLength);
    }
    let rng = SmallRng::from_rng(rng);
    let mut sampler = GibbsChain::new(model, rng, chain);
    sampler.set_state(initial)?;
    Ok((0..draws).map(move |_| sampler.draw()))
}

/// Run `settings.num_chains` independent chains on a thread pool.
///
/// Every chain uses the stream `chain_id` of a `ChaCha8Rng` seeded with
/// `settings.seed` and starts at `initial` or at the model's default
/// initial state. Chains share no state, so results do not depend on
/// `num_cores`.
pub fn sample_parallel<M>(
    model: &M,
    settings: GibbsSettings,
    initial: Option<&M::State>,
    num_cores: usize,
) -> anyhow::Result<MultiTrace<M::State>>
where
    M: GibbsModel,
{
    settings.validate()?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_cores)
        .thread_name(|i| format!("gibbs-worker-{}", i))
        .build()
        .context("Could not start thread pool")?;

    let results: Vec<_> = pool.install(|| {
        (0..settings.num_chains)
            .into_par_iter()
            .map(|chain_id| {
                let chain_id = chain_id as u64;
                let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
                rng.set_stream(chain_id);
                let start = match initial {
                    Some(state) => state.clone(),
                    None => model.init_state(),
                };
                run_chain(model, start, settings.num_draws, chain_id, &mut rng)
                    .with_context(|| format!("Sampling failed in chain {}", chain_id))
            })
            .collect()
    });

    let (traces, errors): (Vec<_>, Vec<_>) = results.into_iter().partition_result();
    if let Some(error) = errors.into_iter().next() {
        return Err(error);
    }
    Ok(traces.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_models::{Counter, FailingWalk};

    use anyhow::Result;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;

    #[test]
    fn run_returns_all_draws() -> Result<()> {
        let model = FailingWalk { fail_at: None };
        let mut rng = StdRng::seed_from_u64(42);
        let trace = run(&model, Counter { value: 0. }, 50, &mut rng)?;
        assert_eq!(trace.len(), 50);
        assert_eq!(trace.chain_id, 0);
        Ok(())
    }

    #[test]
    fn run_rejects_config() {
        let model = FailingWalk { fail_at: None };
        let mut rng = StdRng::seed_from_u64(42);

        let failure = run(&model, Counter { value: 0. }, 0, &mut rng).unwrap_err();
        assert_eq!(failure.error, GibbsError::InvalidChainLength);
        assert!(failure.partial.is_none());

        let failure = run(&model, Counter { value: f64::NAN }, 10, &mut rng).unwrap_err();
        assert!(failure.error.is_config_error());
        assert!(failure.partial.is_none());
    }

    #[test]
    fn run_keeps_partial_trace() {
        let model = FailingWalk { fail_at: Some(7) };
        let mut rng = StdRng::seed_from_u64(42);
        let failure = run(&model, Counter { value: 0. }, 20, &mut rng).unwrap_err();
        assert!(!failure.error.is_config_error());
        assert_eq!(failure.partial.as_ref().map(|t| t.len()), Some(7));
        assert!(failure.to_string().contains("after 7 draws"));
    }

    #[test]
    fn sample_seq() -> Result<()> {
        let model = FailingWalk { fail_at: None };
        let mut rng = StdRng::seed_from_u64(42);
        let chain = sample_sequentially(&model, Counter { value: 0. }, 30, 2, &mut rng)?;
        let draws = chain.collect::<std::result::Result<Vec<_>, _>>()?;
        assert_eq!(draws.len(), 30);
        let (_, info) = &draws[10];
        assert_eq!(info.chain, 2);
        assert_eq!(info.draw, 10);

        // Stopping early is just dropping the iterator.
        let chain = sample_sequentially(&model, Counter { value: 0. }, 1000, 0, &mut rng)?;
        assert_eq!(chain.take(5).count(), 5);
        Ok(())
    }

    #[test]
    fn sample_seq_rejects_empty_chain() {
        let model = FailingWalk { fail_at: None };
        let mut rng = StdRng::seed_from_u64(42);
        let err = sample_sequentially(&model, Counter { value: 0. }, 0, 0, &mut rng)
            .err()
            .unwrap();
        assert_eq!(err, GibbsError::InvalidChainLength);

        let err = sample_sequentially(&model, Counter { value: f64::NAN }, 10, 0, &mut rng)
            .err()
            .unwrap();
        assert!(err.is_config_error());
    }

    #[test]
    fn parallel_chains_are_reproducible() -> Result<()> {
        let model = FailingWalk { fail_at: None };
        let settings = GibbsSettings {
            num_draws: 100,
            num_chains: 4,
            seed: 10,
        };
        let a = sample_parallel(&model, settings, None, 4)?;
        let b = sample_parallel(&model, settings, None, 1)?;
        assert_eq!(a.chains.len(), 4);
        assert_eq!(a.chains.iter().map(|c| c.chain_id).collect_vec(), vec![0, 1, 2, 3]);
        for (x, y) in a.chains.iter().zip(b.chains.iter()) {
            assert_eq!(x.draws, y.draws);
        }
        // Different streams give different chains.
        assert!(a.chains[0].draws != a.chains[1].draws);
        Ok(())
    }

    #[test]
    fn parallel_failure_names_chain() {
        let model = FailingWalk { fail_at: Some(3) };
        let settings = GibbsSettings {
            num_draws: 10,
            num_chains: 2,
            seed: 1,
        };
        let err = sample_parallel(&model, settings, None, 2).unwrap_err();
        assert!(format!("{:#}", err).contains("Sampling failed in chain 0"));
    }
}
