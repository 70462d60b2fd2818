//! Sampling by exact enumeration of the basis.
//!
//! For small bases it is cheaper and more accurate to evaluate `|ψ|²` on
//! every configuration and draw directly from the resulting categorical
//! distribution than to run Markov chains.

use itertools::Itertools;
use ndarray::{Array1, Array2, Array3, ArrayView1};
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    Rng,
};
use rand_distr::weighted::WeightedAliasIndex;

use crate::{
    basis::Basis,
    error::{Result, SamplingError},
    model::{forward_with_batches, LogProbFn},
    options::SamplingOptions,
    sampler::{SampleInfo, Samples},
    spin::WORDS,
};

/// Largest number of categories drawn from in single precision.
///
/// Beyond this size `f32` cannot represent a properly normalised
/// distribution any more.
pub const SINGLE_PRECISION_LIMIT: usize = 1 << 24;

/// Convert log-amplitudes `log|ψ|` into normalised probabilities `|ψ|² / Σ|ψ|²`.
pub fn log_amplitudes_to_probabilities(values: ArrayView1<'_, f32>) -> Array1<f32> {
    let max = values.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let mut prob = values.mapv(|x| (2.0 * (x - max)).exp());
    let total = prob.sum();
    prob /= total;
    prob
}

fn invalid_distribution(err: impl std::fmt::Display) -> SamplingError {
    SamplingError::InvalidDistribution(err.to_string())
}

/// Draw `count` indices with replacement, computing in single precision.
///
/// Returns the indices and the log-probabilities of the drawn categories.
pub(crate) fn draw_single_precision<R: Rng + ?Sized>(
    probabilities: ArrayView1<'_, f32>,
    count: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<f32>)> {
    let dist = WeightedIndex::<f32>::new(probabilities.iter()).map_err(invalid_distribution)?;
    let indices = (0..count).map(|_| dist.sample(rng)).collect_vec();
    let log_prob = indices.iter().map(|&i| probabilities[i].ln()).collect_vec();
    Ok((indices, log_prob))
}

/// Draw `count` indices with replacement from a renormalised `f64` copy of
/// `probabilities`.
pub(crate) fn draw_double_precision<R: Rng + ?Sized>(
    probabilities: ArrayView1<'_, f32>,
    count: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<f32>)> {
    let mut prob = probabilities.mapv(f64::from);
    let total = prob.sum();
    prob /= total;
    let dist = WeightedAliasIndex::new(prob.to_vec()).map_err(invalid_distribution)?;
    let indices = (0..count).map(|_| dist.sample(rng)).collect_vec();
    let log_prob = indices.iter().map(|&i| (prob[i] as f32).ln()).collect_vec();
    Ok((indices, log_prob))
}

/// Sample from `|ψ|²` by enumerating `basis`.
///
/// `log_psi` must return log-amplitudes; it is evaluated on the whole basis
/// in batches of `options.batch_size()`. `number_chains * number_samples`
/// configurations are drawn with replacement and arranged like the output of
/// the Metropolis sampler. `number_discarded` and `sweep_size` are ignored.
pub fn sample_exactly<F, B, R>(
    log_psi: &mut F,
    basis: &B,
    options: &SamplingOptions,
    rng: &mut R,
) -> Result<Samples>
where
    F: LogProbFn + ?Sized,
    B: Basis,
    R: Rng + ?Sized,
{
    sample_exactly_with_limit(log_psi, basis, options, SINGLE_PRECISION_LIMIT, rng)
}

/// [`sample_exactly`] with bases of `single_precision_limit` or more states
/// drawn from in double precision.
pub(crate) fn sample_exactly_with_limit<F, B, R>(
    log_psi: &mut F,
    basis: &B,
    options: &SamplingOptions,
    single_precision_limit: usize,
    rng: &mut R,
) -> Result<Samples>
where
    F: LogProbFn + ?Sized,
    B: Basis,
    R: Rng + ?Sized,
{
    if log_psi.device() != options.device() {
        return Err(SamplingError::WrongDevice {
            expected: options.device(),
            received: log_psi.device(),
        });
    }
    let xs = basis.states().map_err(SamplingError::Basis)?;
    if xs.is_empty() {
        return Err(SamplingError::EmptyBasis);
    }
    let ys = forward_with_batches(log_psi, &xs, options.batch_size())?;
    let probabilities = log_amplitudes_to_probabilities(ys.view());

    let number_samples = options.number_samples();
    let number_chains = options.number_chains();
    let count = number_samples * number_chains;
    let (indices, log_prob) = if probabilities.len() < single_precision_limit {
        log::debug!("drawing {} samples from {} states", count, probabilities.len());
        draw_single_precision(probabilities.view(), count, rng)?
    } else {
        log::debug!(
            "drawing {} samples from {} states in double precision",
            count,
            probabilities.len()
        );
        draw_double_precision(probabilities.view(), count, rng)?
    };

    let states = Array3::from_shape_fn((number_samples, number_chains, WORDS), |(i, j, w)| {
        xs[indices[i * number_chains + j]].words()[w]
    });
    let log_prob = Array2::from_shape_fn((number_samples, number_chains), |(i, j)| {
        log_prob[i * number_chains + j]
    });
    Ok(Samples {
        states,
        log_prob,
        info: SampleInfo::default(),
    })
}
