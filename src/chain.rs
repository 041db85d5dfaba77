use rand::Rng;

use crate::{error::Result, model::GibbsModel};

/// Position of a draw within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Progress {
    pub draw: u64,
    pub chain: u64,
}

/// A single Markov chain: the model, the current state and a private
/// random source.
///
/// The state is only ever changed by [`GibbsChain::draw`], one full sweep
/// at a time.
pub struct GibbsChain<'model, M: GibbsModel, R: Rng> {
    model: &'model M,
    state: M::State,
    rng: R,
    chain: u64,
    draw_count: u64,
}

impl<'model, M: GibbsModel, R: Rng> GibbsChain<'model, M, R> {
    /// Create a chain starting at the model's data-derived initial state.
    pub fn new(model: &'model M, rng: R, chain: u64) -> Self {
        let state = model.init_state();
        GibbsChain {
            model,
            state,
            rng,
            chain,
            draw_count: 0,
        }
    }

    /// Move the chain to a new position.
    ///
    /// This fails if the state does not fit the model.
    pub fn set_state(&mut self, state: M::State) -> Result<()> {
        self.model.check_state(&state)?;
        self.state = state;
        Ok(())
    }

    pub fn state(&self) -> &M::State {
        &self.state
    }

    /// Perform one sweep and return a copy of the new state.
    ///
    /// If the sweep fails the chain state may be partially updated and
    /// should not be used further.
    pub fn draw(&mut self) -> Result<(M::State, Progress)> {
        let draw = self.draw_count;
        self.model.sweep(&mut self.state, draw, &mut self.rng)?;
        self.draw_count += 1;
        Ok((
            self.state.clone(),
            Progress {
                draw,
                chain: self.chain,
            },
        ))
    }
}
