//! Core wireless delivery protocol for GateLink
//!
//! Implements the sensor-side half of a two-node telemetry link: door
//! sensors encode their state into compact frames and push them to an
//! indoor station over an unacknowledged 13-channel radio.
//!
//! Key constraints:
//! - Runs on parts with a few KB of RAM (ESP8266-class nodes)
//! - No heap allocation anywhere
//! - The radio gives one success/failure callback per datagram, nothing more
//!
//! ```no_run
//! use gatelink_core::{ChannelHuntingSender, SensorFrame, FirmwareVersion, PeerIdentity};
//! # use gatelink_core::transport::ScriptedTransport;
//! # let radio = ScriptedTransport::always_delivered();
//!
//! let station = PeerIdentity::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
//! let frame = SensorFrame::new(true, 3870, FirmwareVersion::new(1, 2));
//!
//! let mut sender = ChannelHuntingSender::new(radio);
//! match sender.send_frame(frame, &station) {
//!     Ok(report) if report.delivered => {} // station got it
//!     Ok(_) => {}  // every channel exhausted, sleep and retry next wake
//!     Err(_) => {} // radio driver fault
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod battery;
pub mod errors;
pub mod peer;
pub mod sender;
pub mod time;
pub mod transport;
pub mod wire;

// Public API
pub use errors::{WireError, WireResult};
pub use peer::{Channel, PeerIdentity, CHANNEL_HUNT_ORDER};
pub use sender::{ChannelHuntingSender, SendPolicy, SendReport};
pub use time::{FixedClock, TimeSource, Timestamp, UNSET_TIMESTAMP};
#[cfg(feature = "std")]
pub use time::SystemClock;
pub use transport::{Transport, TxOutcome};
pub use wire::{FirmwareVersion, PairingFrame, SensorFrame, TimestampedReading};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
