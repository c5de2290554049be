//! Seeded, deterministic pseudo-random number generation.
//!
//! Backed by [`rand_pcg::Pcg64`] (the same generator the workspace has
//! always used for deterministic simulation), seeded from an arbitrary
//! string by hashing it with BLAKE3 rather than requiring callers to supply
//! raw seed bytes directly.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn seed_bytes(seed: &str) -> [u8; 32] {
    *blake3::hash(seed.as_bytes()).as_bytes()
}

fn rng_from_bytes(bytes: [u8; 32]) -> Pcg64 {
    let mut seed128 = [0u8; 16];
    seed128.copy_from_slice(&bytes[..16]);
    Pcg64::from_seed(seed128)
}

/// A deterministic random number source.
///
/// The same seed string always produces the same sequence of draws.
/// [`Prng::reset`] rewinds the sequence back to the start, which is what
/// [`Engine::reset`](crate) and replay restoration rely on.
pub struct Prng {
    seed: String,
    rng: Pcg64,
}

impl Prng {
    /// Construct a generator deterministically seeded from `seed`.
    pub fn from_seed(seed: &str) -> Self {
        let rng = rng_from_bytes(seed_bytes(seed));
        Self {
            seed: seed.to_owned(),
            rng,
        }
    }

    /// Re-seed to the original seed, making the sequence repeat from the
    /// start.
    pub fn reset(&mut self) {
        self.rng = rng_from_bytes(seed_bytes(&self.seed));
    }

    /// The seed this generator was constructed from.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform integer in `[lo, hi_exclusive)`.
    ///
    /// Returns `lo` unchanged if the range is empty or inverted.
    pub fn range_i64(&mut self, lo: i64, hi_exclusive: i64) -> i64 {
        if hi_exclusive <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi_exclusive)
    }

    /// Derive a named, deterministic child generator.
    ///
    /// The child's seed is the hash of `original seed || label`, so two
    /// forks with different labels draw independent sequences, while the
    /// same label always forks identically from the same parent seed.
    pub fn fork(&self, label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(b"\0");
        hasher.update(label.as_bytes());
        let bytes = *hasher.finalize().as_bytes();
        Self {
            seed: format!("{}/{}", self.seed, label),
            rng: rng_from_bytes(bytes),
        }
    }
}
