//! Injected randomness for production (random characteristic fallbacks,
//! simulated forensic test error).
//!
//! Production never reaches for a global random source: every call receives a
//! [`RandomSource`]. [`SimRng`] is the SplitMix64 implementation used in play;
//! tests substitute a scripted source to force specific branches.

use crate::fixed::Fixed64;

/// The randomness production needs.
pub trait RandomSource {
    /// Returns `true` with the given probability (clamped to [0, 1]).
    fn roll(&mut self, probability: Fixed64) -> bool;

    /// Uniformly pick an index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms and trivially serializable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Returns `true` with the given probability (Fixed64 in [0, 1]).
    ///
    /// - probability <= 0 always returns false
    /// - probability >= 1 always returns true
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::from_num(1) {
            return true;
        }
        // For p in (0,1) the raw Q32.32 bits are the fraction scaled to
        // [0, 2^32); compare against a uniform u32.
        let upper = (self.next_u64() >> 32) as u32;
        (upper as u64) < probability.to_bits() as u64
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl RandomSource for SimRng {
    fn roll(&mut self, probability: Fixed64) -> bool {
        self.chance(probability)
    }

    fn pick(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "pick from an empty range");
        (self.next_u64() % len.max(1) as u64) as usize
    }
}
