//! Batched Metropolis-Hastings sampling.
//!
//! Many independent chains are advanced in lock-step. After thermalisation
//! the acceptance statistics are reset, and then one sample per chain is
//! recorded every `sweep_size` steps.

use ndarray::{s, Array1, Array2, Array3};
use rand::Rng;

use crate::{
    basis::Basis,
    chain::MarkovChains,
    error::{Result, SamplingError},
    init::prepare_initial_state,
    model::{LogProbFn, TransitionKernel},
    options::SamplingOptions,
    sampler::{SampleInfo, Samples},
    spin::{SpinVector, WORDS},
    state::ChainState,
};

/// Output of [`metropolis_process`].
#[derive(Debug, Clone)]
pub struct MetropolisResult {
    /// Shape `(number_samples, number_chains, WORDS)`.
    pub states: Array3<u64>,
    /// Shape `(number_samples, number_chains)`.
    pub log_prob: Array2<f32>,
    /// Per-chain acceptance rate after thermalisation.
    pub acceptance: Array1<f64>,
}

fn record(states: &mut Array3<u64>, log_prob: &mut Array2<f32>, i: usize, current: &ChainState) {
    for (j, spin) in current.states().iter().enumerate() {
        states
            .slice_mut(s![i, j, ..])
            .iter_mut()
            .zip(spin.words())
            .for_each(|(out, &word)| *out = word);
    }
    log_prob.row_mut(i).assign(&current.log_prob());
}

/// Run Metropolis-Hastings chains starting from `initial_state`.
///
/// `log_prob_fn` must return log-probabilities, i.e. `2 log|ψ|`.
/// The chains first perform `number_discarded` sweeps of `sweep_size` steps
/// without recording anything. The state right after thermalisation is the
/// first sample; every further sample is preceded by one sweep. The
/// acceptance rate therefore covers `(number_samples - 1) * sweep_size`
/// steps per chain, and is zero if `number_samples == 1`.
pub fn metropolis_process<K, F, R>(
    initial_state: (Vec<SpinVector>, Array1<f32>),
    log_prob_fn: &mut F,
    kernel: &mut K,
    number_samples: usize,
    number_discarded: usize,
    sweep_size: usize,
    rng: &mut R,
) -> Result<MetropolisResult>
where
    K: TransitionKernel,
    F: LogProbFn + ?Sized,
    R: Rng + ?Sized,
{
    for (name, value) in [
        ("number_samples", number_samples),
        ("number_discarded", number_discarded),
        ("sweep_size", sweep_size),
    ] {
        if value == 0 {
            return Err(SamplingError::InvalidOption { name, value });
        }
    }
    let (initial_states, initial_norm) = initial_state;
    let number_chains = initial_states.len();
    if number_chains == 0 {
        return Err(SamplingError::InvalidOption {
            name: "number_chains",
            value: number_chains,
        });
    }
    let mut chains = MarkovChains::new(initial_states, initial_norm, kernel, log_prob_fn)?;

    let mut states = Array3::zeros((number_samples, number_chains, WORDS));
    let mut log_prob = Array2::zeros((number_samples, number_chains));

    log::debug!(
        "thermalising {} chains for {} sweeps of {} steps",
        number_chains,
        number_discarded,
        sweep_size
    );
    for _ in 0..number_discarded {
        chains.sweep(sweep_size, rng)?;
    }
    chains.reset_statistics();

    record(&mut states, &mut log_prob, 0, chains.current());
    for i in 1..number_samples {
        chains.sweep(sweep_size, rng)?;
        record(&mut states, &mut log_prob, i, chains.current());
        log::trace!("recorded sample {} of {}", i + 1, number_samples);
    }

    let acceptance = chains.acceptance_rate();
    log::info!("acceptance rate: {:.4}", acceptance.mean().unwrap_or(0.0));
    Ok(MetropolisResult {
        states,
        log_prob,
        acceptance,
    })
}

/// Sample from `|ψ|²` with Metropolis-Hastings chains in `basis`.
///
/// `log_prob_fn` must return log-probabilities on `options.device()`. Chains
/// are started from distinct random representatives and moved with the
/// basis' own kernel.
pub fn sample_using_metropolis<B, F, R>(
    log_prob_fn: &mut F,
    basis: &B,
    options: &SamplingOptions,
    rng: &mut R,
) -> Result<Samples>
where
    B: Basis,
    F: LogProbFn + ?Sized,
    R: Rng + ?Sized,
{
    if log_prob_fn.device() != options.device() {
        return Err(SamplingError::WrongDevice {
            expected: options.device(),
            received: log_prob_fn.device(),
        });
    }
    let initial_states = prepare_initial_state(basis, options.number_chains(), rng)?;
    let initial_norm = initial_states
        .iter()
        .map(|s| basis.norm(s))
        .collect::<Array1<f32>>();
    let mut kernel = basis.kernel();
    let result = metropolis_process(
        (initial_states, initial_norm),
        log_prob_fn,
        &mut kernel,
        options.number_samples(),
        options.number_discarded(),
        options.sweep_size(),
        rng,
    )?;
    let info = SampleInfo {
        acceptance_rate: result.acceptance.mean(),
        chain_acceptance: Some(result.acceptance),
    };
    Ok(Samples {
        states: result.states,
        log_prob: result.log_prob,
        info,
    })
}
