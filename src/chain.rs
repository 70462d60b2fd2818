use ndarray::Array1;
use rand::Rng;

use crate::{
    basis::Basis,
    error::{Result, SamplingError},
    init::prepare_initial_state,
    model::{evaluate, LogProbFn, TransitionKernel},
    spin::SpinVector,
    state::ChainState,
};

/// A batch of Metropolis-Hastings chains which advances one step at a time.
///
/// The kernel and log-probability function are borrowed for the lifetime of
/// the chains; the chain state is owned and only mutated by [`MarkovChains::step`].
pub struct MarkovChains<'a, K, F: ?Sized> {
    kernel: &'a mut K,
    log_prob_fn: &'a mut F,
    state: ChainState,
}

impl<'a, K, F> MarkovChains<'a, K, F>
where
    K: TransitionKernel,
    F: LogProbFn + ?Sized,
{
    /// Start chains at the given configurations.
    ///
    /// The log-probability function is evaluated once on the initial batch.
    pub fn new(
        states: Vec<SpinVector>,
        norm: Array1<f32>,
        kernel: &'a mut K,
        log_prob_fn: &'a mut F,
    ) -> Result<Self> {
        let log_prob = evaluate(&mut *log_prob_fn, &states)?;
        let state = ChainState::new(states, norm, log_prob)?;
        Ok(MarkovChains {
            kernel,
            log_prob_fn,
            state,
        })
    }

    /// Start `number_chains` chains at distinct random representatives of `basis`.
    pub fn bootstrap<B, R>(
        basis: &B,
        kernel: &'a mut K,
        log_prob_fn: &'a mut F,
        number_chains: usize,
        rng: &mut R,
    ) -> Result<Self>
    where
        B: Basis,
        R: Rng + ?Sized,
    {
        let states = prepare_initial_state(basis, number_chains, rng)?;
        let norm = states.iter().map(|s| basis.norm(s)).collect::<Array1<f32>>();
        Self::new(states, norm, kernel, log_prob_fn)
    }

    pub fn current(&self) -> &ChainState {
        &self.state
    }

    pub fn into_state(self) -> ChainState {
        self.state
    }

    /// Propose a move for every chain and accept or reject it.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        let (proposed, proposed_norm) = self
            .kernel
            .propose(&self.state.states, rng)
            .map_err(SamplingError::Kernel)?;
        let proposed_log_prob = evaluate(&mut *self.log_prob_fn, &proposed)?;
        self.state
            .step(&proposed, proposed_norm.view(), proposed_log_prob.view(), rng)
    }

    /// Perform `sweep_size` steps.
    pub fn sweep<R: Rng + ?Sized>(&mut self, sweep_size: usize, rng: &mut R) -> Result<()> {
        for _ in 0..sweep_size {
            self.step(rng)?;
        }
        Ok(())
    }

    pub fn reset_statistics(&mut self) {
        self.state.reset_statistics();
    }

    /// Per-chain fraction of accepted moves since the chains were started or
    /// statistics were last reset.
    pub fn acceptance_rate(&self) -> Array1<f64> {
        self.state.acceptance_rate()
    }
}
