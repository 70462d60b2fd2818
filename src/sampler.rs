use std::collections::HashMap;

use ndarray::{s, Array1, Array2, Array3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    basis::Basis,
    error::{Result, SamplingError},
    exact::sample_exactly,
    metropolis::sample_using_metropolis,
    model::{Doubled, LogProbFn},
    options::{SamplingMode, SamplingOptions},
    spin::{SpinVector, WORDS},
};

/// Diagnostic information attached to a batch of samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleInfo {
    /// Mean acceptance rate over all chains. `None` for exact sampling.
    pub acceptance_rate: Option<f64>,
    /// Acceptance rate of every chain. `None` for exact sampling.
    pub chain_acceptance: Option<Array1<f64>>,
}

impl SampleInfo {
    /// Flatten the scalar statistics into a string-keyed map.
    pub fn to_map(&self) -> HashMap<String, f64> {
        let mut map = HashMap::new();
        if let Some(rate) = self.acceptance_rate {
            map.insert("acceptance_rate".to_string(), rate);
        }
        if let Some(chains) = &self.chain_acceptance {
            if let Some(min) = chains.iter().copied().reduce(f64::min) {
                map.insert("min_chain_acceptance".to_string(), min);
            }
            if let Some(max) = chains.iter().copied().reduce(f64::max) {
                map.insert("max_chain_acceptance".to_string(), max);
            }
        }
        map
    }
}

/// Configurations drawn by one of the samplers.
#[derive(Debug, Clone)]
pub struct Samples {
    /// Packed spin configurations, shape `(number_samples, number_chains, WORDS)`.
    pub states: Array3<u64>,
    /// `log|ψ|²` of every configuration, shape `(number_samples, number_chains)`.
    pub log_prob: Array2<f32>,
    pub info: SampleInfo,
}

impl Samples {
    pub fn number_samples(&self) -> usize {
        self.states.shape()[0]
    }

    pub fn number_chains(&self) -> usize {
        self.states.shape()[1]
    }

    /// Configuration `i` of chain `j`.
    pub fn spin(&self, i: usize, j: usize) -> SpinVector {
        let mut words = [0u64; WORDS];
        words
            .iter_mut()
            .zip(self.states.slice(s![i, j, ..]))
            .for_each(|(out, &word)| *out = word);
        SpinVector::from_words(words)
    }

    /// Position of every configuration in `basis`, shape `(number_samples, number_chains)`.
    ///
    /// Indices are returned as floats so they can be fed straight into the
    /// autocorrelation estimator.
    pub fn basis_indices<B: Basis>(&self, basis: &B) -> Result<Array2<f64>> {
        let mut indices = Array2::zeros((self.number_samples(), self.number_chains()));
        for ((i, j), out) in indices.indexed_iter_mut() {
            let spin = self.spin(i, j);
            let index = basis.index(&spin).ok_or(SamplingError::NotInBasis(spin))?;
            *out = index as f64;
        }
        Ok(indices)
    }
}

impl SamplingMode {
    /// Draw samples from `|ψ|²` using this mode and the given random number generator.
    ///
    /// `log_psi` returns log-amplitudes `log|ψ|`.
    pub fn sample_with_rng<F, B, R>(
        &self,
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
        log::debug!(
            "sampling {} x {} configurations of {} spins in {} mode",
            options.number_samples(),
            options.number_chains(),
            basis.number_spins(),
            self
        );
        match self {
            SamplingMode::Exact => sample_exactly(log_psi, basis, options, rng),
            SamplingMode::Metropolis => {
                sample_using_metropolis(&mut Doubled(log_psi), basis, options, rng)
            }
            SamplingMode::Zanella => Err(SamplingError::UnimplementedMode(*self)),
        }
    }

    /// Draw samples with a generator seeded from `options.seed()`.
    pub fn sample<F, B>(
        &self,
        log_psi: &mut F,
        basis: &B,
        options: &SamplingOptions,
    ) -> Result<Samples>
    where
        F: LogProbFn + ?Sized,
        B: Basis,
    {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed());
        self.sample_with_rng(log_psi, basis, options, &mut rng)
    }
}

/// Draw samples from `|ψ|²`, where `log_psi` returns log-amplitudes.
///
/// Equivalent to `mode.sample(log_psi, basis, options)`.
pub fn sample_some<F, B>(
    log_psi: &mut F,
    basis: &B,
    options: &SamplingOptions,
    mode: SamplingMode,
) -> Result<Samples>
where
    F: LogProbFn + ?Sized,
    B: Basis,
{
    mode.sample(log_psi, basis, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::test_basis::SpinBasis;
    use anyhow::Result as AnyResult;
    use ndarray::{ArrayD, IxDyn};
    use pretty_assertions::assert_eq;

    fn log_psi(states: &[SpinVector]) -> AnyResult<ArrayD<f32>> {
        Ok(ArrayD::from_shape_fn(IxDyn(&[states.len()]), |idx| {
            -0.1 * states[idx[0]].words()[0].leading_zeros() as f32
        }))
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let basis = SpinBasis::new(8, Some(4)).unwrap();
        let options = SamplingOptions::new(50, 3).unwrap().with_seed(17);
        for mode in [SamplingMode::Exact, SamplingMode::Metropolis] {
            let a = mode.sample(&mut log_psi, &basis, &options).unwrap();
            let b = sample_some(&mut log_psi, &basis, &options, mode).unwrap();
            assert_eq!(a.states, b.states);
            assert_eq!(a.log_prob, b.log_prob);
            assert_eq!(a.info, b.info);
        }
    }

    #[test]
    fn metropolis_reports_log_probabilities() {
        let basis = SpinBasis::new(8, Some(4)).unwrap();
        let options = SamplingOptions::new(20, 2).unwrap();
        let samples = SamplingMode::Metropolis
            .sample(&mut log_psi, &basis, &options)
            .unwrap();
        for ((i, j), &lp) in samples.log_prob.indexed_iter() {
            let expected = 2.0 * log_psi(&[samples.spin(i, j)]).unwrap()[0];
            assert_eq!(lp, expected);
        }
        let map = samples.info.to_map();
        assert!(map.contains_key("acceptance_rate"));
        assert!(map["min_chain_acceptance"] <= map["max_chain_acceptance"]);
    }

    #[test]
    fn zanella_is_reserved() {
        let basis = SpinBasis::new(4, Some(2)).unwrap();
        let options = SamplingOptions::new(1, 1).unwrap();
        assert!(matches!(
            SamplingMode::Zanella.sample(&mut log_psi, &basis, &options),
            Err(SamplingError::UnimplementedMode(SamplingMode::Zanella))
        ));
    }

    #[test]
    fn indices_outside_basis() {
        let basis = SpinBasis::new(4, Some(2)).unwrap();
        let mut samples = Samples {
            states: Array3::zeros((1, 1, WORDS)),
            log_prob: Array2::zeros((1, 1)),
            info: SampleInfo::default(),
        };
        assert!(matches!(
            samples.basis_indices(&basis),
            Err(SamplingError::NotInBasis(_))
        ));
        samples.states[[0, 0, 0]] = 0b0101;
        assert_eq!(samples.basis_indices(&basis).unwrap()[[0, 0]], 1.0);
    }
}
