//! Serial number allocation.
//!
//! A [`Sequencer`] hands out strictly increasing serial numbers for the
//! lifetime of the value. It is not persisted: two processes, or the same
//! process after a restart, will hand out the same serials again. Deployments
//! that need globally unique serials implement [`SerialAllocator`] on top of
//! an externally coordinated counter and pass it to the factory instead.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RootCaError};

/// The first serial handed out by [`Sequencer::new`].
pub const INITIAL_SERIAL: u64 = 1;

/// A certificate serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNumber(u64);

impl SerialNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Big-endian encoding, as used for the X.509 `serialNumber` field.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parses the big-endian magnitude of a DER `INTEGER`.
    ///
    /// Leading zero octets are ignored; values wider than 64 bits are rejected.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self> {
        let significant: &[u8] = match bytes.iter().position(|b| *b != 0) {
            Some(start) => &bytes[start..],
            None => &[],
        };
        if significant.len() > 8 {
            return Err(RootCaError::DecodingError(format!(
                "serial number of {} octets does not fit in 64 bits",
                significant.len()
            )));
        }
        let value = significant
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        Ok(Self(value))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SerialNumber> for u64 {
    fn from(serial: SerialNumber) -> Self {
        serial.0
    }
}

/// Source of certificate serial numbers.
pub trait SerialAllocator: Send + Sync {
    /// Returns a serial strictly greater than every serial previously returned
    /// by this allocator.
    fn next_serial(&self) -> Result<SerialNumber>;
}

/// In-process serial allocator backed by an atomic counter.
#[derive(Debug)]
pub struct Sequencer {
    next: AtomicU64,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// Creates a sequencer whose first serial is [`INITIAL_SERIAL`].
    pub fn new() -> Self {
        Self::starting_at(INITIAL_SERIAL)
    }

    /// Creates a sequencer whose first serial is `first`.
    ///
    /// Zero is not a valid serial number and is raised to one.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }
}

impl SerialAllocator for Sequencer {
    /// `u64::MAX` is never handed out: the counter must be able to advance past
    /// the returned value.
    fn next_serial(&self) -> Result<SerialNumber> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(1)
            })
            .map(SerialNumber)
            .map_err(|_| RootCaError::SequencerExhausted)
    }
}
