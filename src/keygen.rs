//! Random key generation for soak cycles.
//!
//! Keys are opaque identifiers, not content digests. Each [`KeyGenerator`]
//! owns its own seeded generator; there is no process-wide random state, so
//! a run can be replayed by passing the seed it reported.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Symbols keys are drawn from.
pub const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default key length.
pub const DEFAULT_KEY_LENGTH: usize = 32;

/// Seeded generator of fixed-length random keys.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    rng: StdRng,
    seed: u64,
    length: usize,
}

impl KeyGenerator {
    /// Create a generator with an explicit seed and the default key length.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            length: DEFAULT_KEY_LENGTH,
        }
    }

    /// Create a generator seeded from the wall clock (nanoseconds since epoch).
    #[must_use]
    pub fn from_clock() -> Self {
        let now = chrono::Utc::now();
        let seed = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros()) as u64;
        Self::from_seed(seed)
    }

    /// Set the key length. Zero is treated as one.
    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length.max(1);
        self
    }

    /// The seed this generator was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Length of generated keys.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Produce the next key.
    pub fn next_key(&mut self) -> String {
        (0..self.length)
            .map(|_| CHARSET[self.rng.random_range(0..CHARSET.len())] as char)
            .collect()
    }
}

impl Iterator for KeyGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_key())
    }
}
