//! Error Types for the Wire Codec
//!
//! ## Design Philosophy
//!
//! GateLink's error types follow the same rules as the rest of the core:
//!
//! 1. **Small Size**: Every variant is a handful of bytes; errors travel
//!    through hot receive paths and must not bloat return values.
//!
//! 2. **No Heap Allocation**: All error data is inline. No String, no
//!    boxing, deterministic memory usage on the smallest targets.
//!
//! 3. **Copy Semantics**: Errors implement Copy so they can be returned
//!    and stored without move-semantics friction.
//!
//! ## What is NOT an error
//!
//! The protocol deliberately keeps several conditions out of the error
//! taxonomy (see the system-level failure policy):
//!
//! - A sensor frame whose numeric fields look implausible still decodes:
//!   there is no checksum on the wire, so every bit pattern of the numeric
//!   fields is considered valid.
//! - A failed radio attempt is not an error; it is a counted outcome the
//!   channel-hunting sender retries through.
//! - An unknown sender address is a dispatch decision on the station side,
//!   not a decode failure.

use thiserror_no_std::Error;

/// Result type for codec operations
pub type WireResult<T> = Result<T, WireError>;

/// Decode errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Payload length does not match the fixed frame size
    #[error("Frame length {actual} does not match expected {expected}")]
    Length {
        /// Byte count the codec requires
        expected: usize,
        /// Byte count actually received
        actual: usize,
    },

    /// Magic number of a pairing frame did not match
    ///
    /// Treated by the dispatcher as "not a pairing frame", never fatal.
    #[error("Pairing magic {found:#010x} does not match")]
    Magic {
        /// The 32-bit value found where the magic number belongs
        found: u32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for WireError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Length { expected, actual } =>
                defmt::write!(fmt, "Frame length {} != expected {}", actual, expected),
            Self::Magic { found } =>
                defmt::write!(fmt, "Pairing magic {:#x} mismatch", found),
        }
    }
}
