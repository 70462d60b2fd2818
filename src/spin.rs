//! Fixed-width spin configurations.
//!
//! A configuration is stored as eight 64-bit words, so up to 512 spins fit
//! into a single [`SpinVector`]. Spin `i` lives in bit `i % 64` of word
//! `i / 64`; a set bit means spin up.

use ndarray::Array2;

use crate::error::{Result, SamplingError};

/// Number of 64-bit words in a configuration.
pub const WORDS: usize = 8;

/// Maximal number of spins a [`SpinVector`] can hold.
pub const MAX_SPINS: usize = 64 * WORDS;

/// A basis configuration as a 512-bit integer.
///
/// Equality, ordering and hashing treat all words as one value, so spin
/// vectors can be used as keys in sets when deduplicating representatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpinVector {
    words: [u64; WORDS],
}

impl SpinVector {
    pub const fn zero() -> Self {
        SpinVector { words: [0; WORDS] }
    }

    pub const fn from_words(words: [u64; WORDS]) -> Self {
        SpinVector { words }
    }

    /// Build a configuration from a row of words as stored in a sample array.
    ///
    /// Missing trailing words are treated as zero.
    pub fn from_slice(words: &[u64]) -> Result<Self> {
        if words.len() > WORDS {
            return Err(SamplingError::WrongLength {
                expected: WORDS,
                received: words.len(),
            });
        }
        let mut out = Self::zero();
        out.words[..words.len()].copy_from_slice(words);
        Ok(out)
    }

    pub fn words(&self) -> &[u64; WORDS] {
        &self.words
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < MAX_SPINS);
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < MAX_SPINS);
        let mask = 1u64 << (i % 64);
        if value {
            self.words[i / 64] |= mask;
        } else {
            self.words[i / 64] &= !mask;
        }
    }

    #[inline]
    pub fn flip(&mut self, i: usize) {
        debug_assert!(i < MAX_SPINS);
        self.words[i / 64] ^= 1u64 << (i % 64);
    }

    /// Hamming weight, i.e. the number of spins pointing up.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Write the first `number_spins` spins as `±1.0` into `out`.
    pub fn unpack_into(&self, out: &mut [f32]) {
        for (i, x) in out.iter_mut().enumerate() {
            *x = if self.get(i) { 1.0 } else { -1.0 };
        }
    }
}

impl From<u64> for SpinVector {
    fn from(value: u64) -> Self {
        let mut out = SpinVector::zero();
        out.words[0] = value;
        out
    }
}

/// Convert a batch of configurations into a `(batch, number_spins)` matrix
/// of `±1.0`, the usual input encoding of amplitude networks.
pub fn unpack(states: &[SpinVector], number_spins: usize) -> Result<Array2<f32>> {
    if number_spins > MAX_SPINS {
        return Err(SamplingError::TooManySpins(number_spins));
    }
    let mut out = Array2::zeros((states.len(), number_spins));
    for (state, mut row) in states.iter().zip(out.rows_mut()) {
        // rows of a freshly allocated standard-layout array are contiguous
        match row.as_slice_mut() {
            Some(row) => state.unpack_into(row),
            None => row
                .iter_mut()
                .enumerate()
                .for_each(|(i, x)| *x = if state.get(i) { 1.0 } else { -1.0 }),
        }
    }
    Ok(out)
}
