//! Randomness sources for key generation.

use std::sync::Mutex;

use rand::{SeedableRng, rngs::StdRng};
use rand_core::{CryptoRng, RngCore};

use crate::error::{Result, RootCaError};

/// A source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `dest` entirely with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system's entropy source.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        rand_core::OsRng.try_fill_bytes(dest).map_err(|e| {
            RootCaError::KeyGenerationFailed(format!("operating system entropy source failed: {e}"))
        })
    }
}

/// A deterministic source seeded from a fixed value.
///
/// Only suitable for tests: every instance built from the same seed produces
/// the same keys.
#[derive(Debug)]
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
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        let mut rng = self.rng.lock().map_err(|_| {
            RootCaError::KeyGenerationFailed("seeded random source is poisoned".to_string())
        })?;
        rand::RngCore::fill_bytes(&mut *rng, dest);
        Ok(())
    }
}

/// Adapts a [`RandomSource`] to the `rand_core` traits expected by the key
/// generators.
///
/// `RngCore::fill_bytes` cannot fail, so the first failure of the source is
/// recorded and reported by [`EntropyRng::finish`]; anything generated after a
/// failure must be discarded.
pub(crate) struct EntropyRng<'a> {
    source: &'a dyn RandomSource,
    failure: Option<RootCaError>,
    // Keeps prime and scalar searches terminating once the source has failed.
    fallback: Option<StdRng>,
}

impl<'a> EntropyRng<'a> {
    pub(crate) fn new(source: &'a dyn RandomSource) -> Self {
        Self {
            source,
            failure: None,
            fallback: None,
        }
    }

    /// Returns the first failure of the underlying source, if any.
    pub(crate) fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, err: RootCaError) {
        self.failure.get_or_insert(err);
    }
}

impl RngCore for EntropyRng<'_> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.failure.is_none() {
            match self.source.fill_bytes(dest) {
                Ok(()) => return,
                Err(err) => self.record(err),
            }
        }
        let fallback = self
            .fallback
            .get_or_insert_with(|| StdRng::seed_from_u64(0));
        rand::RngCore::fill_bytes(fallback, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
        if let Some(err) = &self.failure {
            return Err(rand_core::Error::new(err.clone()));
        }
        self.source.fill_bytes(dest).map_err(|err| {
            self.record(err.clone());
            rand_core::Error::new(err)
        })
    }
}

impl CryptoRng for EntropyRng<'_> {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Succeeds for the first `budget` calls, then fails.
    struct FailingSource {
        budget: usize,
        calls: AtomicUsize,
    }

    impl RandomSource for FailingSource {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.budget {
                dest.fill(0x5a);
                Ok(())
            } else {
                Err(RootCaError::KeyGenerationFailed("entropy exhausted".to_string()))
            }
        }
    }

    #[test]
    fn test_seeded_source_is_deterministic() {
        let (a, b) = (SeededRandom::new(7), SeededRandom::new(7));
        let (mut left, mut right) = ([0u8; 32], [0u8; 32]);
        a.fill_bytes(&mut left).unwrap();
        b.fill_bytes(&mut right).unwrap();
        assert_eq!(left, right);

        let other = SeededRandom::new(8);
        other.fill_bytes(&mut right).unwrap();
        assert_ne!(left, right);
    }

    #[test]
    fn test_os_source_fills_buffer() {
        let mut buf = [0u8; 64];
        OsRandom.fill_bytes(&mut buf).unwrap();
        assert!(buf.iter().any(|b| *b != 0));
    }

    #[test]
    fn test_adapter_records_first_failure() {
        let source = FailingSource {
            budget: 1,
            calls: AtomicUsize::new(0),
        };
        let mut rng = EntropyRng::new(&source);
        let mut buf = [0u8; 16];
        rng.fill_bytes(&mut buf);
        assert_eq!(buf, [0x5a; 16]);
        rng.fill_bytes(&mut buf);
        rng.fill_bytes(&mut buf);
        assert!(rng.try_fill_bytes(&mut buf).is_err());
        assert_eq!(
            rng.finish(),
            Err(RootCaError::KeyGenerationFailed("entropy exhausted".to_string()))
        );
    }

    #[test]
    fn test_adapter_without_failure_finishes_cleanly() {
        let source = SeededRandom::new(1);
        let mut rng = EntropyRng::new(&source);
        let _ = rng.next_u64();
        assert!(rng.finish().is_ok());
    }
}
