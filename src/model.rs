//! Interfaces of the collaborators the samplers drive.
//!
//! Provides the `LogProbFn` trait for functions that score configurations
//! and the `TransitionKernel` trait for proposal generators, together with
//! helpers to evaluate large batches in bounded chunks.

use anyhow::Result;
use ndarray::{Array1, ArrayD, Axis, Ix1};
use rand::Rng;

use crate::{error::SamplingError, options::Device, spin::SpinVector};

/// A function which assigns an unnormalized log-weight to configurations.
///
/// Depending on the call site, this is either the log-amplitude `log|ψ(s)|`
/// or the log-probability `log|ψ(s)|²`. The output must contain one value
/// per input configuration; a trailing dimension of size one is allowed and
/// squeezed away.
pub trait LogProbFn {
    fn evaluate(&mut self, states: &[SpinVector]) -> Result<ArrayD<f32>>;

    /// Where the results of `evaluate` live.
    fn device(&self) -> Device {
        Device::Cpu
    }
}

impl<F> LogProbFn for F
where
    F: FnMut(&[SpinVector]) -> Result<ArrayD<f32>>,
{
    fn evaluate(&mut self, states: &[SpinVector]) -> Result<ArrayD<f32>> {
        self(states)
    }
}

/// Generates possible transitions for a batch of chains.
pub trait TransitionKernel {
    /// Given the current configurations, return one proposed configuration
    /// per chain together with its norm.
    ///
    /// The norm corrects for representatives which stand for a different
    /// number of configurations. A norm of zero means that the proposed
    /// configuration has no weight and must never be accepted.
    fn propose<R: Rng + ?Sized>(
        &mut self,
        states: &[SpinVector],
        rng: &mut R,
    ) -> Result<(Vec<SpinVector>, Array1<f32>)>;
}

impl<K: TransitionKernel> TransitionKernel for &mut K {
    fn propose<R: Rng + ?Sized>(
        &mut self,
        states: &[SpinVector],
        rng: &mut R,
    ) -> Result<(Vec<SpinVector>, Array1<f32>)> {
        (**self).propose(states, rng)
    }
}

/// Turns a log-amplitude function into a log-probability function.
pub(crate) struct Doubled<'a, F: ?Sized>(pub(crate) &'a mut F);

impl<F: LogProbFn + ?Sized> LogProbFn for Doubled<'_, F> {
    fn evaluate(&mut self, states: &[SpinVector]) -> Result<ArrayD<f32>> {
        let mut values = self.0.evaluate(states)?;
        values.mapv_inplace(|x| 2.0 * x);
        Ok(values)
    }

    fn device(&self) -> Device {
        self.0.device()
    }
}

/// Reduce the output of a log-probability function to a vector of `expected` values.
pub(crate) fn squeeze(
    values: ArrayD<f32>,
    expected: usize,
) -> std::result::Result<Array1<f32>, SamplingError> {
    let values = if values.ndim() == 2 && values.len_of(Axis(1)) == 1 {
        values.remove_axis(Axis(1))
    } else {
        values
    };
    let ndim = values.ndim();
    let values = values
        .into_dimensionality::<Ix1>()
        .map_err(|_| SamplingError::WrongRank(ndim))?;
    if values.len() != expected {
        return Err(SamplingError::WrongLength {
            expected,
            received: values.len(),
        });
    }
    Ok(values)
}

/// Evaluate `log_prob_fn` on a single batch and squeeze the result.
pub(crate) fn evaluate<F: LogProbFn + ?Sized>(
    log_prob_fn: &mut F,
    states: &[SpinVector],
) -> std::result::Result<Array1<f32>, SamplingError> {
    let values = log_prob_fn
        .evaluate(states)
        .map_err(SamplingError::Evaluator)?;
    squeeze(values, states.len())
}

/// Evaluate `log_prob_fn` on `states` in chunks of at most `batch_size`
/// configurations.
pub fn forward_with_batches<F: LogProbFn + ?Sized>(
    log_prob_fn: &mut F,
    states: &[SpinVector],
    batch_size: usize,
) -> std::result::Result<Array1<f32>, SamplingError> {
    if batch_size == 0 {
        return Err(SamplingError::InvalidBatchSize(batch_size));
    }
    let mut out = Vec::with_capacity(states.len());
    for chunk in states.chunks(batch_size) {
        let values = evaluate(log_prob_fn, chunk)?;
        out.extend(values.iter().copied());
    }
    Ok(Array1::from_vec(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use pretty_assertions::assert_eq;

    fn weight(states: &[SpinVector]) -> Result<ArrayD<f32>> {
        Ok(ArrayD::from_shape_fn(IxDyn(&[states.len(), 1]), |idx| {
            states[idx[0]].count_ones() as f32
        }))
    }

    #[test]
    fn squeeze_trailing_dimension() {
        let values = ArrayD::zeros(IxDyn(&[3, 1]));
        assert_eq!(squeeze(values, 3).unwrap().len(), 3);

        let values = ArrayD::zeros(IxDyn(&[3]));
        assert_eq!(squeeze(values, 3).unwrap().len(), 3);

        let values = ArrayD::zeros(IxDyn(&[3, 2]));
        assert!(matches!(squeeze(values, 3), Err(SamplingError::WrongRank(2))));

        let values = ArrayD::zeros(IxDyn(&[2]));
        assert!(matches!(
            squeeze(values, 3),
            Err(SamplingError::WrongLength {
                expected: 3,
                received: 2
            })
        ));
    }

    #[test]
    fn batches_are_bounded() {
        let states = (0..10u64).map(SpinVector::from).collect::<Vec<_>>();
        let mut largest = 0;
        let mut log_prob_fn = |states: &[SpinVector]| {
            largest = largest.max(states.len());
            weight(states)
        };
        let values = forward_with_batches(&mut log_prob_fn, &states, 3).unwrap();
        assert_eq!(largest, 3);
        let expected = (0..10u64).map(|x| x.count_ones() as f32).collect::<Vec<_>>();
        assert_eq!(values.to_vec(), expected);

        assert!(forward_with_batches(&mut weight, &states, 0).is_err());
    }

    #[test]
    fn doubled_log_prob() {
        let states = [SpinVector::from(0b11u64)];
        let mut log_psi = weight;
        let values = evaluate(&mut Doubled(&mut log_psi), &states).unwrap();
        assert_eq!(values.to_vec(), vec![4.0]);
    }
}
