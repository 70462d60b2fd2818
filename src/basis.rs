use std::borrow::Cow;

use anyhow::Result;

use crate::{model::TransitionKernel, spin::SpinVector};

/// A Hilbert space basis of spin configurations.
///
/// The basis knows which configurations are valid, maps arbitrary
/// configurations to their representatives and provides a transition
/// kernel which only proposes valid configurations.
pub trait Basis {
    /// Proposal generator for Metropolis sampling in this basis.
    type Kernel<'basis>: TransitionKernel
    where
        Self: 'basis;

    fn number_spins(&self) -> usize;

    /// Number of spins pointing up, if it is conserved.
    fn hamming_weight(&self) -> Option<usize>;

    /// All representatives of the basis, in the order used by [`Basis::index`].
    fn states(&self) -> Result<Cow<'_, [SpinVector]>>;

    /// Map a configuration to its representative and the norm of its orbit.
    fn full_info(&self, spin: &SpinVector) -> (SpinVector, f32);

    fn norm(&self, spin: &SpinVector) -> f32 {
        self.full_info(spin).1
    }

    /// Position of a representative in [`Basis::states`].
    fn index(&self, spin: &SpinVector) -> Option<usize>;

    fn kernel(&self) -> Self::Kernel<'_>;
}

/// Plain bases without symmetries, used to test samplers.
pub mod test_basis {
    use std::borrow::Cow;

    use anyhow::{bail, Result};
    use itertools::Itertools;
    use ndarray::Array1;
    use rand::Rng;

    use super::Basis;
    use crate::{model::TransitionKernel, spin::SpinVector};

    /// All configurations of at most 32 spins, optionally restricted to a
    /// fixed Hamming weight. Every configuration is its own representative.
    #[derive(Debug, Clone)]
    pub struct SpinBasis {
        number_spins: usize,
        hamming_weight: Option<usize>,
        states: Vec<SpinVector>,
    }

    impl SpinBasis {
        pub fn new(number_spins: usize, hamming_weight: Option<usize>) -> Result<Self> {
            if number_spins == 0 || number_spins > 32 {
                bail!("invalid number_spins: {}; expected a value in [1, 32]", number_spins);
            }
            let states = match hamming_weight {
                Some(weight) => {
                    if weight > number_spins {
                        bail!(
                            "invalid hamming_weight: {}; expected a value in [0, {}]",
                            weight,
                            number_spins
                        );
                    }
                    (0..number_spins)
                        .combinations(weight)
                        .map(|ones| ones.into_iter().fold(0u64, |x, i| x | (1 << i)))
                        .sorted()
                        .map(SpinVector::from)
                        .collect_vec()
                }
                None => (0..(1u64 << number_spins)).map(SpinVector::from).collect_vec(),
            };
            Ok(SpinBasis {
                number_spins,
                hamming_weight,
                states,
            })
        }

        pub fn number_states(&self) -> usize {
            self.states.len()
        }
    }

    impl Basis for SpinBasis {
        type Kernel<'basis> = ExchangeKernel<'basis>;

        fn number_spins(&self) -> usize {
            self.number_spins
        }

        fn hamming_weight(&self) -> Option<usize> {
            self.hamming_weight
        }

        fn states(&self) -> Result<Cow<'_, [SpinVector]>> {
            Ok(Cow::Borrowed(&self.states))
        }

        fn full_info(&self, spin: &SpinVector) -> (SpinVector, f32) {
            (*spin, 1.0)
        }

        fn index(&self, spin: &SpinVector) -> Option<usize> {
            self.states.binary_search(spin).ok()
        }

        fn kernel(&self) -> ExchangeKernel<'_> {
            ExchangeKernel { basis: self }
        }
    }

    /// Proposes to exchange a random up spin with a random down spin, which
    /// keeps the Hamming weight fixed. Without a fixed weight a single random
    /// spin is flipped instead.
    pub struct ExchangeKernel<'basis> {
        basis: &'basis SpinBasis,
    }

    impl TransitionKernel for ExchangeKernel<'_> {
        fn propose<R: Rng + ?Sized>(
            &mut self,
            states: &[SpinVector],
            rng: &mut R,
        ) -> Result<(Vec<SpinVector>, Array1<f32>)> {
            let n = self.basis.number_spins;
            let proposed = states
                .iter()
                .map(|state| {
                    let mut state = *state;
                    if self.basis.hamming_weight.is_none() {
                        state.flip(rng.random_range(0..n));
                        return state;
                    }
                    let (up, down): (Vec<usize>, Vec<usize>) =
                        (0..n).partition(|&i| state.get(i));
                    if !up.is_empty() && !down.is_empty() {
                        state.flip(up[rng.random_range(0..up.len())]);
                        state.flip(down[rng.random_range(0..down.len())]);
                    }
                    state
                })
                .collect_vec();
            let norm = Array1::ones(proposed.len());
            Ok((proposed, norm))
        }
    }
}
