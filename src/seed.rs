//! Content-derived seeding for the heuristic scorers.
//!
//! The heuristics add small random perturbations to their outputs. Seeding
//! from the image bytes keeps those perturbations reproducible: the same
//! upload always produces the same numbers.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// First 8 hex digits of the MD5 digest of `bytes`, as an integer.
///
/// Hashing is over the raw upload, not the decoded pixels, so two encodings of
/// the same picture may get different seeds.
pub fn deterministic_seed(bytes: &[u8]) -> u32 {
    let digest = md5::compute(bytes);
    u32::from_be_bytes([digest.0[0], digest.0[1], digest.0[2], digest.0[3]])
}

/// Per-call generator. Every draw advances the stream, so callers must draw
/// in a fixed order to reproduce a result.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
        }
    }

    /// Uniform draw in `[lo, hi)`. Returns `lo` for an empty range.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    /// Symmetric noise in `[-amplitude, amplitude)`.
    pub fn noise(&mut self, amplitude: f64) -> f64 {
        self.uniform(-amplitude, amplitude)
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
