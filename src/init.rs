use std::collections::HashSet;

use itertools::Itertools;
use rand::{seq::index, Rng};

use crate::{
    basis::Basis,
    error::{Result, SamplingError},
    spin::{SpinVector, MAX_SPINS},
};

/// Minimal number of random candidates generated by [`prepare_initial_state`].
const MIN_CANDIDATES: usize = 10000;

/// Draw a uniformly random configuration of `number_spins` spins.
///
/// If `hamming_weight` is given, exactly that many spins point up.
pub fn random_spin_configuration<R: Rng + ?Sized>(
    number_spins: usize,
    hamming_weight: Option<usize>,
    rng: &mut R,
) -> Result<SpinVector> {
    if number_spins > MAX_SPINS {
        return Err(SamplingError::TooManySpins(number_spins));
    }
    let mut spin = SpinVector::zero();
    match hamming_weight {
        Some(weight) => {
            if weight > number_spins {
                return Err(SamplingError::InvalidHammingWeight {
                    weight,
                    number_spins,
                });
            }
            for i in index::sample(rng, number_spins, weight) {
                spin.set(i, true);
            }
        }
        None => {
            for i in 0..number_spins {
                spin.set(i, rng.random::<bool>());
            }
        }
    }
    Ok(spin)
}

/// Generate a batch of valid starting configurations (i.e. representatives).
///
/// A pool of at least `max(2 * batch_size, 10000)` random configurations is
/// mapped to representatives and deduplicated; the batch is then drawn from
/// the pool without replacement. If the basis has fewer distinct
/// representatives than `batch_size`, the pool is reused in fresh random order.
pub fn prepare_initial_state<B, R>(
    basis: &B,
    batch_size: usize,
    rng: &mut R,
) -> Result<Vec<SpinVector>>
where
    B: Basis,
    R: Rng + ?Sized,
{
    if batch_size == 0 {
        return Err(SamplingError::InvalidBatchSize(batch_size));
    }
    let number_spins = basis.number_spins();
    let hamming_weight = basis.hamming_weight();

    let mut pool = HashSet::new();
    for _ in 0..(2 * batch_size).max(MIN_CANDIDATES) {
        let spin = random_spin_configuration(number_spins, hamming_weight, rng)?;
        pool.insert(basis.full_info(&spin).0);
    }
    // HashSet iteration order is not reproducible between runs
    let pool = pool.into_iter().sorted_unstable().collect_vec();

    let mut batch = Vec::with_capacity(batch_size);
    while batch.len() < batch_size {
        let amount = (batch_size - batch.len()).min(pool.len());
        batch.extend(index::sample(rng, pool.len(), amount).into_iter().map(|i| pool[i]));
    }
    Ok(batch)
}
