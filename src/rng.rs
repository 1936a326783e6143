// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Seedable pseudorandom numbers.

use std::time::{SystemTime, UNIX_EPOCH};

/// A small, fast pseudorandom generator. Seed it explicitly when a session has
/// to be reproducible.
#[derive(Debug, Clone)]
pub struct Rng(oorandom::Rand64);
impl Default for Rng {
    fn default() -> Self {
        // This is an awful source of entropy, but it's fine for a toy where we
        // just want each session to wobble differently.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0x5eed);
        Self::new_with_seed(seed)
    }
}
impl Rng {
    #[allow(missing_docs)]
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    #[allow(missing_docs)]
    pub fn rand_u64(&mut self) -> u64 {
        self.0.rand_u64()
    }

    /// A value in [0.0, 1.0).
    pub fn rand_float(&mut self) -> f64 {
        self.0.rand_float()
    }

    /// A value in [-1.0, 1.0).
    pub fn rand_bipolar(&mut self) -> f64 {
        self.0.rand_float() * 2.0 - 1.0
    }

    #[allow(missing_docs)]
    pub fn rand_range(&mut self, range: std::ops::Range<u64>) -> u64 {
        self.0.rand_range(range)
    }

    /// Returns true with the given probability. Probabilities at or below
    /// zero never succeed, and at or above one always do.
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.rand_float() < probability
        }
    }
}
