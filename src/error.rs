use thiserror::Error;

use crate::{
    options::{Device, SamplingMode},
    spin::{SpinVector, MAX_SPINS},
};

#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("invalid {name}: {value}; expected a positive integer")]
    InvalidOption { name: &'static str, value: usize },

    #[error("invalid batch size: {0}; expected a positive integer")]
    InvalidBatchSize(usize),

    #[error("invalid Hamming weight: {weight}; expected a value in [0, {number_spins}]")]
    InvalidHammingWeight { weight: usize, number_spins: usize },

    #[error("too many spins: {0}; at most {max} are supported", max = MAX_SPINS)]
    TooManySpins(usize),

    #[error(
        "log-probability function should return one real number per configuration, \
         but output has dimension {0}; did you use a sign instead of an amplitude network?"
    )]
    WrongRank(usize),

    #[error("expected {expected} values, but received {received}")]
    WrongLength { expected: usize, received: usize },

    #[error(
        "log-probability function should return values residing on {expected}; \
         received values residing on {received} instead"
    )]
    WrongDevice { expected: Device, received: Device },

    #[error("invalid mode: {0:?}; must be one of \"exact\", \"metropolis\", \"zanella\"")]
    UnsupportedMode(String),

    #[error("sampling mode {0} is not implemented")]
    UnimplementedMode(SamplingMode),

    #[error("basis contains no states")]
    EmptyBasis,

    #[error("cannot build a probability distribution: {0}")]
    InvalidDistribution(String),

    #[error("series has zero variance, its autocorrelation function is undefined")]
    DegenerateSeries,

    #[error("configuration {0:?} is not part of the basis")]
    NotInBasis(SpinVector),

    #[error("index {index} is out of range for {size} states")]
    OutOfRange { index: usize, size: usize },

    #[error("log-probability function returned an error")]
    Evaluator(#[source] anyhow::Error),

    #[error("transition kernel returned an error")]
    Kernel(#[source] anyhow::Error),

    #[error("basis returned an error")]
    Basis(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SamplingError>;
