//! Seedable random number generator for deterministic testing.
//!
//! When a seed is provided via [`ConfigBuilder::rng_seed`], ephemeral secrets
//! and reservoir draws become reproducible. Without a seed all randomness
//! comes from the operating system.
//!
//! [`ConfigBuilder::rng_seed`]: crate::ConfigBuilder::rng_seed

use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};

/// A cryptographically secure RNG that can be seeded for tests.
pub struct SeededRng {
    inner: Option<StdRng>,
}

impl SeededRng {
    /// Create a new RNG with an optional seed.
    ///
    /// If `seed` is `Some`, the RNG will produce deterministic values.
    /// If `seed` is `None`, it reads from the operating system.
    pub fn new(seed: Option<u64>) -> Self {
        let inner = seed.map(StdRng::seed_from_u64);
        Self { inner }
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        match self.inner.as_mut() {
            Some(rng) => rng.next_u32(),
            None => OsRng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self.inner.as_mut() {
            Some(rng) => rng.next_u64(),
            None => OsRng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self.inner.as_mut() {
            Some(rng) => rng.fill_bytes(dest),
            None => OsRng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self.inner.as_mut() {
            Some(rng) => rng.try_fill_bytes(dest),
            None => OsRng.try_fill_bytes(dest),
        }
    }
}

// Both StdRng and OsRng are CSPRNGs.
impl CryptoRng for SeededRng {}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let is_seeded = self.inner.is_some();
        f.debug_struct("SeededRng")
            .field("seeded", &is_seeded)
            .finish()
    }
}
