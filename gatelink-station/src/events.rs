//! Normalized Station Events and Collaborator Seams
//!
//! ## Overview
//!
//! The dispatcher does not know how LEDs animate or how the web UI is
//! pushed to; it emits normalized events through two narrow collaborator
//! traits and moves on. Everything downstream of these seams (LED effect
//! configuration, server-sent events, templating) is glue outside this
//! crate.
//!
//! Under `std` each event renders to a named JSON payload, which is
//! exactly the shape the web push channel publishes.

use gatelink_core::{PeerIdentity, Timestamp};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Normalized event emitted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StationEvent {
    /// A paired sensor reported; last-known state changed
    ReadingChanged {
        /// Sensor slot the reading was attributed to
        slot: u8,
        /// Door contact state
        door_open: bool,
        /// Battery level from the discharge curve, two fractional digits
        battery_percent: f32,
        /// Whether the battery is below the empty threshold
        battery_low: bool,
        /// Epoch seconds at receipt, -1 while the clock is unsynchronized
        timestamp: Timestamp,
    },

    /// The pairing state machine changed
    PairingStatus {
        /// Whether a slot is armed for pairing
        active: bool,
        /// The armed slot, when active
        slot: Option<u8>,
    },

    /// A frame arrived from an address matching no paired slot
    UnknownSender {
        /// The unmatched hardware address
        #[cfg_attr(feature = "serde", serde(serialize_with = "fmt_address"))]
        address: PeerIdentity,
    },
}

#[cfg(feature = "serde")]
fn fmt_address<S: serde::Serializer>(address: &PeerIdentity, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(address)
}

impl StationEvent {
    /// Event name for the web push channel
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReadingChanged { .. } => "new_sensor_reading",
            Self::PairingStatus { .. } => "new_sensor_pairing_status",
            Self::UnknownSender { .. } => "unknown_sensor",
        }
    }

    /// JSON payload for the web push channel
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> std::string::String {
        // Events are plain data; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// LED driver consumed by the dispatcher
pub trait LedDriver {
    /// Show door state (and a low-battery warning) for one slot
    fn set_sensor_status(&mut self, slot: u8, open: bool, battery_low: bool);

    /// Turn one slot's LED off (no data / factory reset)
    fn set_off(&mut self, slot: u8);
}

/// Web push channel consumed by the dispatcher
pub trait EventSink {
    /// Publish one named event toward the UI
    fn publish(&mut self, event: &StationEvent);
}

/// LED driver that drives nothing (headless stations, tests)
#[derive(Debug, Default)]
pub struct NullLeds;

impl LedDriver for NullLeds {
    fn set_sensor_status(&mut self, _slot: u8, _open: bool, _battery_low: bool) {}
    fn set_off(&mut self, _slot: u8) {}
}

/// Event sink that drops everything (headless stations, tests)
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: &StationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_stable() {
        let event = StationEvent::PairingStatus {
            active: true,
            slot: Some(1),
        };
        assert_eq!(event.name(), "new_sensor_pairing_status");
    }

    #[cfg(feature = "std")]
    #[test]
    fn reading_changed_payload_shape() {
        let event = StationEvent::ReadingChanged {
            slot: 0,
            door_open: true,
            battery_percent: 64.5,
            battery_low: false,
            timestamp: 1_700_000_000,
        };

        let json = event.to_json();
        assert!(json.contains("\"slot\":0"));
        assert!(json.contains("\"door_open\":true"));
        assert!(json.contains("\"battery_percent\":64.5"));
        assert!(json.contains("\"timestamp\":1700000000"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn unknown_sender_serializes_address_as_text() {
        let event = StationEvent::UnknownSender {
            address: PeerIdentity::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
        };
        assert!(event.to_json().contains("AA:BB:CC:DD:EE:FF"));
    }
}
