//! Randomness capability used for salt generation.
//! Production code draws from the operating system CSPRNG; tests can swap in a
//! seeded generator to make records reproducible.

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::error::NativeError;

pub trait RandomSource: Send + Sync {
    /// Fills `dest` entirely or fails; partial fills are never reported as success.
    fn fill(&self, dest: &mut [u8]) -> Result<(), NativeError>;
}

/// Operating system CSPRNG (`getrandom` under the hood).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), NativeError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| NativeError::Internal(format!("os randomness unavailable: {e}")))
    }
}

/// Deterministic generator for tests. Never use it to hash real credentials.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), NativeError> {
        self.rng
            .lock()
            .try_fill_bytes(dest)
            .map_err(|e| NativeError::Internal(format!("seeded rng failed: {e}")))
    }
}
