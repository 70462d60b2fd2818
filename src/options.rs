use std::{fmt, str::FromStr};

use crate::error::{Result, SamplingError};

/// The computation domain a sampling run targets.
///
/// Log-probability functions report where their results live, and samplers
/// refuse to mix results from different domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            _ => s
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| format!("invalid device: {:?}", s)),
        }
    }
}

/// Sampling strategies known to the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMode {
    /// Enumerate the basis and draw from the exact distribution.
    Exact,
    /// Batched Metropolis-Hastings chains.
    Metropolis,
    /// Reserved. Selecting it fails with [`SamplingError::UnimplementedMode`].
    Zanella,
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SamplingMode::Exact => "exact",
            SamplingMode::Metropolis => "metropolis",
            SamplingMode::Zanella => "zanella",
        };
        f.write_str(name)
    }
}

impl FromStr for SamplingMode {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(SamplingMode::Exact),
            "metropolis" => Ok(SamplingMode::Metropolis),
            "zanella" => Ok(SamplingMode::Zanella),
            _ => Err(SamplingError::UnsupportedMode(s.to_string())),
        }
    }
}

/// Options for Monte Carlo sampling of spin configurations.
///
/// Every count is validated when it is set, so a `SamplingOptions` value
/// is always usable as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingOptions {
    number_samples: usize,
    number_chains: usize,
    number_discarded: usize,
    sweep_size: usize,
    batch_size: usize,
    device: Device,
    seed: u64,
}

fn positive(name: &'static str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(SamplingError::InvalidOption { name, value });
    }
    Ok(value)
}

impl SamplingOptions {
    /// Default number of configurations passed to the log-probability
    /// function at once when evaluating a full basis.
    pub const DEFAULT_BATCH_SIZE: usize = 8192;

    /// Create options for `number_chains` chains of `number_samples` samples each.
    ///
    /// The thermalisation length defaults to 10% of `number_samples` (but at
    /// least one sweep), the sweep size to 1.
    pub fn new(number_samples: usize, number_chains: usize) -> Result<Self> {
        let number_samples = positive("number_samples", number_samples)?;
        let number_chains = positive("number_chains", number_chains)?;
        Ok(SamplingOptions {
            number_samples,
            number_chains,
            number_discarded: (number_samples / 10).max(1),
            sweep_size: 1,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            device: Device::Cpu,
            seed: 0,
        })
    }

    /// Number of sweeps to perform before recording samples.
    pub fn with_number_discarded(self, number_discarded: usize) -> Result<Self> {
        Ok(SamplingOptions {
            number_discarded: positive("number_discarded", number_discarded)?,
            ..self
        })
    }

    /// Number of Metropolis steps between two recorded samples.
    pub fn with_sweep_size(self, sweep_size: usize) -> Result<Self> {
        Ok(SamplingOptions {
            sweep_size: positive("sweep_size", sweep_size)?,
            ..self
        })
    }

    /// Upper bound on the number of configurations evaluated at once.
    pub fn with_batch_size(self, batch_size: usize) -> Result<Self> {
        Ok(SamplingOptions {
            batch_size: positive("batch_size", batch_size)?,
            ..self
        })
    }

    pub fn with_device(self, device: Device) -> Self {
        SamplingOptions { device, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        SamplingOptions { seed, ..self }
    }

    pub fn number_samples(&self) -> usize {
        self.number_samples
    }

    pub fn number_chains(&self) -> usize {
        self.number_chains
    }

    pub fn number_discarded(&self) -> usize {
        self.number_discarded
    }

    pub fn sweep_size(&self) -> usize {
        self.sweep_size
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
