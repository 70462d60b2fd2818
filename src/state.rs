use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};
use rand::Rng;

use crate::{
    error::{Result, SamplingError},
    spin::SpinVector,
};

/// Current position of a batch of independent Markov chains.
///
/// All per-chain quantities are stored along the chain dimension, so that
/// an acceptance step is a handful of whole-batch array operations.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub(crate) states: Vec<SpinVector>,
    pub(crate) norm: Array1<f32>,
    pub(crate) log_prob: Array1<f32>,
    pub(crate) accepted: Array1<u64>,
    pub(crate) steps: u64,
}

fn check_length(expected: usize, received: usize) -> Result<()> {
    if expected != received {
        return Err(SamplingError::WrongLength { expected, received });
    }
    Ok(())
}

impl ChainState {
    pub fn new(states: Vec<SpinVector>, norm: Array1<f32>, log_prob: Array1<f32>) -> Result<Self> {
        check_length(states.len(), norm.len())?;
        check_length(states.len(), log_prob.len())?;
        let accepted = Array1::zeros(states.len());
        Ok(ChainState {
            states,
            norm,
            log_prob,
            accepted,
            steps: 0,
        })
    }

    pub fn number_chains(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[SpinVector] {
        &self.states
    }

    pub fn norm(&self) -> ArrayView1<'_, f32> {
        self.norm.view()
    }

    pub fn log_prob(&self) -> ArrayView1<'_, f32> {
        self.log_prob.view()
    }

    /// Number of accepted transitions per chain since the last reset.
    pub fn accepted(&self) -> ArrayView1<'_, u64> {
        self.accepted.view()
    }

    /// Number of steps since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Forget acceptance statistics, e.g. after thermalisation.
    pub fn reset_statistics(&mut self) {
        self.accepted.fill(0);
        self.steps = 0;
    }

    /// Fraction of accepted transitions per chain since the last reset.
    ///
    /// Zero if no steps have been taken yet.
    pub fn acceptance_rate(&self) -> Array1<f64> {
        if self.steps == 0 {
            return Array1::zeros(self.accepted.len());
        }
        let steps = self.steps as f64;
        self.accepted.mapv(|n| n as f64 / steps)
    }

    /// Perform one Metropolis-Hastings step for every chain.
    ///
    /// Chain `i` moves to the proposed configuration if its norm is positive and
    /// `u * proposed_norm[i] / norm[i] <= exp(proposed_log_prob[i] - log_prob[i])`
    /// for a fresh `u ~ U[0, 1)`. Returns the number of chains which moved.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        proposed: &[SpinVector],
        proposed_norm: ArrayView1<'_, f32>,
        proposed_log_prob: ArrayView1<'_, f32>,
        rng: &mut R,
    ) -> Result<usize> {
        let n = self.number_chains();
        check_length(n, proposed.len())?;
        check_length(n, proposed_norm.len())?;
        check_length(n, proposed_log_prob.len())?;

        let u = Array1::from_shape_fn(n, |_| rng.random::<f32>());
        let accept = Zip::from(&u)
            .and(&proposed_norm)
            .and(&self.norm)
            .and(&proposed_log_prob)
            .and(&self.log_prob)
            .map_collect(|&u, &new_norm, &norm, &new_log_prob, &log_prob| {
                let r = u * new_norm / norm;
                new_norm > 0.0 && r <= (new_log_prob - log_prob).exp()
            });

        Zip::from(ArrayViewMut1::from(self.states.as_mut_slice()))
            .and(ArrayView1::from(proposed))
            .and(&accept)
            .for_each(|state, &new_state, &t| {
                if t {
                    *state = new_state;
                }
            });
        Zip::from(&mut self.norm)
            .and(&mut self.log_prob)
            .and(&proposed_norm)
            .and(&proposed_log_prob)
            .and(&accept)
            .for_each(|norm, log_prob, &new_norm, &new_log_prob, &t| {
                if t {
                    *norm = new_norm;
                    *log_prob = new_log_prob;
                }
            });
        Zip::from(&mut self.accepted)
            .and(&accept)
            .for_each(|accepted, &t| *accepted += t as u64);
        self.steps += 1;

        Ok(accept.iter().filter(|&&t| t).count())
    }
}
