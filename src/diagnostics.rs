//! Statistical checks for sampler output.

use ndarray::Array1;
use rand::{distr::Distribution, Rng};
use rand_distr::Poisson;

use crate::error::{Result, SamplingError};

fn histogram<P>(draw: &mut P, n: usize, number_samples: usize) -> Result<Array1<f64>>
where
    P: FnMut() -> Result<usize>,
{
    let mut counts = Array1::zeros(n);
    for _ in 0..number_samples {
        let index = draw()?;
        if index >= n {
            return Err(SamplingError::OutOfRange { index, size: n });
        }
        counts[index] += 1.0;
    }
    Ok(counts)
}

/// L1 closeness test between two discrete distributions on `0..n`.
///
/// `p` and `q` draw one category each time they are called. Every trial
/// draws `M ~ Poisson(m)` samples from both and computes
/// `Z = Σ ((x - y)² - x - y) / (x + y)` over categories with `x + y > 0`;
/// the trial passes if `Z <= c * sqrt(M)`. Returns one verdict per trial.
pub fn closeness_test_l1<P, Q, R>(
    p: &mut P,
    q: &mut Q,
    n: usize,
    c: f64,
    m: f64,
    trials: usize,
    rng: &mut R,
) -> Result<Vec<bool>>
where
    P: FnMut() -> Result<usize>,
    Q: FnMut() -> Result<usize>,
    R: Rng + ?Sized,
{
    let poisson = Poisson::new(m).map_err(|e| SamplingError::InvalidDistribution(e.to_string()))?;
    (0..trials)
        .map(|_| {
            let number_samples = poisson.sample(rng) as usize;
            let x = histogram(p, n, number_samples)?;
            let y = histogram(q, n, number_samples)?;
            let z = x
                .iter()
                .zip(&y)
                .filter(|&(&x, &y)| x + y > 0.0)
                .map(|(&x, &y)| ((x - y).powi(2) - x - y) / (x + y))
                .sum::<f64>();
            log::debug!("closeness statistic {:.3} for {} samples", z, number_samples);
            Ok(z <= c * (number_samples as f64).sqrt())
        })
        .collect()
}
