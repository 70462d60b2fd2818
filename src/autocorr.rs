//! Integrated autocorrelation time of Markov chain output.
//!
//! The autocorrelation function is computed with zero-padded FFTs and the
//! integrated time is truncated with Sokal's adaptive window.

use std::sync::Arc;

use itertools::Itertools;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{Result, SamplingError};

/// Default window factor `c` of [`integrated_autocorr_time`].
pub const DEFAULT_WINDOW_FACTOR: f64 = 5.0;

/// Forward and inverse transforms for series of one length.
struct AutocorrPlan {
    len: usize,
    padded: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl AutocorrPlan {
    fn new(len: usize) -> Self {
        // twice the next power of two, so that the circular correlation does
        // not wrap around
        let padded = 2 * len.next_power_of_two();
        let mut planner = FftPlanner::new();
        AutocorrPlan {
            len,
            padded,
            forward: planner.plan_fft_forward(padded),
            inverse: planner.plan_fft_inverse(padded),
        }
    }

    fn run(&self, x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        debug_assert_eq!(x.len(), self.len);
        if x.is_empty() {
            return Err(SamplingError::DegenerateSeries);
        }
        let mean = x.sum() / x.len() as f64;
        let mut buffer = vec![Complex::new(0.0, 0.0); self.padded];
        buffer
            .iter_mut()
            .zip(x)
            .for_each(|(out, &value)| out.re = value - mean);

        self.forward.process(&mut buffer);
        buffer.iter_mut().for_each(|c| *c = *c * c.conj());
        self.inverse.process(&mut buffer);

        let zero = buffer[0].re;
        if zero.is_nan() || zero <= 0.0 {
            return Err(SamplingError::DegenerateSeries);
        }
        let mut acf = buffer[..self.len]
            .iter()
            .map(|c| c.re / zero)
            .collect::<Array1<f64>>();
        acf[0] = 1.0;
        Ok(acf)
    }
}

/// Normalised autocorrelation function of a one-dimensional series.
///
/// The mean is subtracted before correlating, and the result is scaled so
/// that lag zero is exactly one. Fails with
/// [`SamplingError::DegenerateSeries`] if the series is empty or constant.
pub fn autocorr_function(x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
    AutocorrPlan::new(x.len()).run(x)
}

/// Sokal's adaptive window.
///
/// Returns the smallest `m` with `m >= c * taus[m]`, or the last index if
/// there is none.
pub fn auto_window(taus: ArrayView1<'_, f64>, c: f64) -> usize {
    taus.iter()
        .enumerate()
        .position(|(m, &tau)| m as f64 >= c * tau)
        .unwrap_or(taus.len().saturating_sub(1))
}

/// Integrated autocorrelation time of `samples`, shaped `(number_samples, number_chains)`.
///
/// The autocorrelation functions of all chains are averaged before
/// integrating, and the sum is truncated at [`auto_window`] with factor `c`.
/// Strongly anticorrelated series may produce a negative estimate.
pub fn integrated_autocorr_time(samples: ArrayView2<'_, f64>, c: f64) -> Result<f64> {
    let number_chains = samples.len_of(Axis(1));
    if number_chains == 0 {
        return Err(SamplingError::DegenerateSeries);
    }
    let plan = AutocorrPlan::new(samples.len_of(Axis(0)));
    let chains = samples.axis_iter(Axis(1)).collect_vec();
    let functions = chains
        .par_iter()
        .map(|chain| plan.run(chain.view()))
        .collect::<Result<Vec<_>>>()?;

    let mut mean = Array1::zeros(plan.len);
    for acf in &functions {
        mean += acf;
    }
    mean /= number_chains as f64;

    let taus = mean
        .iter()
        .scan(0.0, |sum, &x| {
            *sum += x;
            Some(2.0 * *sum - 1.0)
        })
        .collect::<Array1<f64>>();
    let window = auto_window(taus.view(), c);
    log::debug!("autocorrelation window: {}", window);
    Ok(taus[window])
}
