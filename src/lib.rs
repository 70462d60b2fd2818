//! Sample spin configurations from `|ψ|²`, where `ψ` is given by its
//! log-amplitudes, and estimate how correlated the samples are.
//!
//! Two samplers are provided: batched Metropolis-Hastings chains driven by a
//! basis-specific transition kernel, and exact sampling by enumerating the
//! basis. Pick one with [`SamplingMode`] and call [`sample_some`].

pub mod autocorr;
pub mod basis;
pub(crate) mod chain;
pub mod diagnostics;
pub(crate) mod error;
pub(crate) mod exact;
pub(crate) mod init;
pub(crate) mod metropolis;
pub(crate) mod model;
pub(crate) mod options;
pub(crate) mod sampler;
pub(crate) mod spin;
pub(crate) mod state;

pub use autocorr::{auto_window, autocorr_function, integrated_autocorr_time};
pub use basis::Basis;
pub use chain::MarkovChains;
pub use diagnostics::closeness_test_l1;
pub use error::{Result, SamplingError};
pub use exact::{log_amplitudes_to_probabilities, sample_exactly};
pub use init::{prepare_initial_state, random_spin_configuration};
pub use metropolis::{metropolis_process, sample_using_metropolis, MetropolisResult};
pub use model::{forward_with_batches, LogProbFn, TransitionKernel};
pub use options::{Device, SamplingMode, SamplingOptions};
pub use sampler::{sample_some, SampleInfo, Samples};
pub use spin::{unpack, SpinVector, MAX_SPINS, WORDS};
pub use state::ChainState;
