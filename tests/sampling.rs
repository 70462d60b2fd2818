use anyhow::Result as AnyResult;
use itertools::Itertools;
use ndarray::{Array1, ArrayD, Axis, IxDyn};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spin_sampler::{
    basis::test_basis::SpinBasis, closeness_test_l1, integrated_autocorr_time, metropolis_process,
    sample_some, Device, LogProbFn, SamplingError, SamplingMode, SamplingOptions,
    SpinVector, TransitionKernel, WORDS,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn uniform(states: &[SpinVector]) -> AnyResult<ArrayD<f32>> {
    Ok(ArrayD::zeros(IxDyn(&[states.len(), 1])))
}

/// Proposes every configuration's successor, which the flat target always accepts.
struct Shift;

impl TransitionKernel for Shift {
    fn propose<R: Rng + ?Sized>(
        &mut self,
        states: &[SpinVector],
        _rng: &mut R,
    ) -> AnyResult<(Vec<SpinVector>, Array1<f32>)> {
        let proposed = states
            .iter()
            .map(|s| SpinVector::from(s.words()[0] + 1))
            .collect_vec();
        Ok((proposed, Array1::ones(states.len())))
    }
}

struct OnDevice(Device);

impl LogProbFn for OnDevice {
    fn evaluate(&mut self, states: &[SpinVector]) -> AnyResult<ArrayD<f32>> {
        uniform(states)
    }

    fn device(&self) -> Device {
        self.0
    }
}

#[test]
fn exact_sampling_shape() {
    init_logging();
    let basis = SpinBasis::new(10, Some(5)).unwrap();
    assert_eq!(basis.number_states(), 252);
    let options = SamplingOptions::new(100, 4).unwrap();
    let samples = sample_some(&mut uniform, &basis, &options, SamplingMode::Exact).unwrap();
    assert_eq!(samples.states.shape(), &[100, 4, WORDS]);
    assert_eq!(samples.log_prob.shape(), &[100, 4]);
    assert!(samples.log_prob.iter().all(|x| x.is_finite() && *x <= 0.0));
    assert!(samples.info.to_map().is_empty());
}

#[test]
fn trivial_kernel_is_always_accepted() {
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let result = metropolis_process(
        (vec![SpinVector::from(1u64)], Array1::ones(1)),
        &mut uniform,
        &mut Shift,
        5,
        1,
        1,
        &mut rng,
    )
    .unwrap();
    assert_eq!(result.states.shape(), &[5, 1, WORDS]);
    assert_eq!(result.acceptance.to_vec(), vec![1.0]);
    // one step of burn-in, then one step before each further sample
    let first_words = result.states.index_axis(Axis(2), 0).iter().copied().collect_vec();
    assert_eq!(first_words, vec![2, 3, 4, 5, 6]);
}

#[test]
fn alternating_series_correlation_time() {
    let n = 1024;
    let series = Array1::from_shape_fn(n, |i| if i % 2 == 0 { 1.0 } else { -1.0 });
    let tau = integrated_autocorr_time(series.view().insert_axis(Axis(1)), 5.0).unwrap();
    assert!(tau.is_finite());
    assert!((tau - (2.0 / n as f64 - 1.0)).abs() < 1e-10);
    let again = integrated_autocorr_time(series.view().insert_axis(Axis(1)), 5.0).unwrap();
    assert_eq!(tau, again);
}

#[test]
fn rejects_unknown_and_reserved_modes() {
    assert!(matches!(
        "gibbs".parse::<SamplingMode>(),
        Err(SamplingError::UnsupportedMode(_))
    ));
    let mode: SamplingMode = "zanella".parse().unwrap();
    let basis = SpinBasis::new(4, Some(2)).unwrap();
    let options = SamplingOptions::new(10, 2).unwrap();
    assert!(matches!(
        sample_some(&mut uniform, &basis, &options, mode),
        Err(SamplingError::UnimplementedMode(SamplingMode::Zanella))
    ));
}

#[test]
fn validates_log_psi_output() {
    init_logging();
    let basis = SpinBasis::new(6, Some(3)).unwrap();
    let options = SamplingOptions::new(10, 2).unwrap();
    let mut matrix = |states: &[SpinVector]| -> AnyResult<ArrayD<f32>> {
        Ok(ArrayD::zeros(IxDyn(&[states.len(), 3])))
    };
    for mode in [SamplingMode::Exact, SamplingMode::Metropolis] {
        assert!(matches!(
            sample_some(&mut matrix, &basis, &options, mode),
            Err(SamplingError::WrongRank(2))
        ));
        assert!(matches!(
            sample_some(&mut OnDevice(Device::Cuda(0)), &basis, &options, mode),
            Err(SamplingError::WrongDevice {
                expected: Device::Cpu,
                received: Device::Cuda(0)
            })
        ));
        assert!(sample_some(&mut OnDevice(Device::Cpu), &basis, &options, mode).is_ok());
    }
    let mut failing =
        |_: &[SpinVector]| -> AnyResult<ArrayD<f32>> { anyhow::bail!("network diverged") };
    assert!(matches!(
        sample_some(&mut failing, &basis, &options, SamplingMode::Metropolis),
        Err(SamplingError::Evaluator(_))
    ));
}

/// Run the L1 closeness test of `mode` against uniform draws from `basis`.
fn uniform_closeness(mode: SamplingMode, options: SamplingOptions) -> Vec<bool> {
    let basis = SpinBasis::new(10, Some(5)).unwrap();
    let n = basis.number_states();
    let mut sampler_rng = ChaCha8Rng::seed_from_u64(1);
    let mut reference_rng = ChaCha8Rng::seed_from_u64(2);
    let mut buffer = Vec::new();
    let mut p = || -> spin_sampler::Result<usize> {
        if buffer.is_empty() {
            let samples = mode.sample_with_rng(&mut uniform, &basis, &options, &mut sampler_rng)?;
            buffer = samples
                .basis_indices(&basis)?
                .iter()
                .map(|&i| i as usize)
                .collect_vec();
        }
        Ok(buffer.pop().unwrap())
    };
    let mut q = || -> spin_sampler::Result<usize> { Ok(reference_rng.random_range(0..n)) };
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    closeness_test_l1(&mut p, &mut q, n, 1.0, 10000.0, 10, &mut rng).unwrap()
}

#[test]
fn exact_sampling_is_uniform() {
    init_logging();
    let number_chains = 2;
    let options = SamplingOptions::new(10240, number_chains).unwrap();
    let results = uniform_closeness(SamplingMode::Exact, options);
    assert!(results.iter().filter(|&&t| t).count() >= 9, "{:?}", results);
}

#[test]
fn metropolis_sampling_is_uniform() {
    init_logging();
    let options = SamplingOptions::new(640, 16)
        .unwrap()
        .with_sweep_size(20)
        .unwrap();
    let results = uniform_closeness(SamplingMode::Metropolis, options);
    assert!(results.iter().filter(|&&t| t).count() >= 9, "{:?}", results);
}

#[test]
fn metropolis_samples_are_nearly_independent() {
    init_logging();
    let basis = SpinBasis::new(10, Some(5)).unwrap();
    let options = SamplingOptions::new(2000, 8)
        .unwrap()
        .with_sweep_size(10)
        .unwrap()
        .with_seed(123);
    let samples = sample_some(&mut uniform, &basis, &options, SamplingMode::Metropolis).unwrap();
    assert!(samples.info.acceptance_rate.unwrap() > 0.99);
    let observable = samples.basis_indices(&basis).unwrap();
    let tau = integrated_autocorr_time(observable.view(), 5.0).unwrap();
    assert!(tau.is_finite() && tau < 3.0, "tau: {}", tau);
}
