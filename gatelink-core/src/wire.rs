//! Fixed-Size Wire Codec for Sensor and Pairing Frames
//!
//! ## Overview
//!
//! Everything that crosses the radio link or lands in persistent storage is
//! one of three fixed-size, packed little-endian records. Fixed sizes keep
//! both ends allocation-free and make "is this frame well-formed" a plain
//! length comparison.
//!
//! ## Byte Layout
//!
//! ```text
//! SensorFrame (5 bytes):
//! ┌──────────┬─────────────────────┬───────────┬──────────────┐
//! │ byte 0   │ bytes 1-2 (LE)      │ byte 3    │ byte 4       │
//! │ door     │ battery millivolts  │ attempts  │ fw version   │
//! │ 0=closed │ u16                 │ u8        │ major<<4|min │
//! └──────────┴─────────────────────┴───────────┴──────────────┘
//!
//! PairingFrame (4 bytes):
//! ┌─────────────────────────────┐
//! │ bytes 0-3 (LE)              │
//! │ magic number 0x50414952     │
//! └─────────────────────────────┘
//!
//! TimestampedReading record (13 bytes):
//! ┌─────────────────┬──────────────────────────┐
//! │ bytes 0-4       │ bytes 5-12 (LE)          │
//! │ SensorFrame     │ timestamp i64, -1=unset  │
//! └─────────────────┴──────────────────────────┘
//! ```
//!
//! ## Reliability Notes
//!
//! There is deliberately no checksum: the transport's own framing is the
//! only integrity guarantee, and every bit pattern of the numeric fields
//! decodes successfully. `decode` can therefore fail only on a length
//! mismatch (sensor frames) or a magic-number mismatch (pairing frames).
//! Adding a CRC would change the on-air and on-disk formats and is left as
//! an explicit extension point.

use crate::errors::{WireError, WireResult};
use crate::time::{Timestamp, UNSET_TIMESTAMP};

/// Firmware version packed as major/minor nibbles in one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareVersion(u8);

impl FirmwareVersion {
    /// Pack a major/minor pair; both are masked to their low nibble
    pub const fn new(major: u8, minor: u8) -> Self {
        Self((major & 0x0F) << 4 | (minor & 0x0F))
    }

    /// Reconstruct from the packed wire byte
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Major version (0..=15)
    pub const fn major(&self) -> u8 {
        self.0 >> 4
    }

    /// Minor version (0..=15)
    pub const fn minor(&self) -> u8 {
        self.0 & 0x0F
    }

    /// The packed byte as it appears on the wire
    pub const fn as_byte(&self) -> u8 {
        self.0
    }
}

/// One sensor status report, produced once per wake cycle
///
/// Immutable once constructed, except for the attempt counter which the
/// channel-hunting sender rewrites before each retransmission so frames
/// after the first carry delivery diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFrame {
    /// Door contact state; polarity is fixed at the sensor's pin config
    pub door_open: bool,
    /// Measured battery voltage in millivolts
    pub battery_millivolts: u16,
    /// Transmission attempts consumed before this frame went out
    pub send_attempts: u8,
    /// Sender firmware version, packed major/minor
    pub firmware_version: FirmwareVersion,
}

impl SensorFrame {
    /// Encoded size in bytes
    pub const WIRE_SIZE: usize = 5;

    /// Create a fresh frame with a zero attempt counter
    pub const fn new(door_open: bool, battery_millivolts: u16, firmware_version: FirmwareVersion) -> Self {
        Self {
            door_open,
            battery_millivolts,
            send_attempts: 0,
            firmware_version,
        }
    }

    /// Encode into the packed 5-byte wire form
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mv = self.battery_millivolts.to_le_bytes();
        [
            self.door_open as u8,
            mv[0],
            mv[1],
            self.send_attempts,
            self.firmware_version.as_byte(),
        ]
    }

    /// Decode from wire bytes
    ///
    /// Fails only on length mismatch; any nonzero door byte reads as open.
    pub fn decode(bytes: &[u8]) -> WireResult<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(WireError::Length {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            door_open: bytes[0] != 0,
            battery_millivolts: u16::from_le_bytes([bytes[1], bytes[2]]),
            send_attempts: bytes[3],
            firmware_version: FirmwareVersion::from_byte(bytes[4]),
        })
    }
}

/// Frame a sensor broadcasts while its pairing button is held
///
/// Carries nothing but the magic sentinel; the station only needs the
/// transport-level sender address to learn the peer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairingFrame;

impl PairingFrame {
    /// Encoded size in bytes
    pub const WIRE_SIZE: usize = 4;

    /// Magic sentinel (ASCII "PAIR" packed into a u32)
    pub const MAGIC: u32 = 0x5041_4952;

    /// Encode into the 4-byte wire form
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        Self::MAGIC.to_le_bytes()
    }

    /// Decode from wire bytes
    ///
    /// Fails on length mismatch or when the magic number is absent; the
    /// dispatcher treats either as "not a pairing frame" and moves on.
    pub fn decode(bytes: &[u8]) -> WireResult<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(WireError::Length {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }

        let found = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if found != Self::MAGIC {
            return Err(WireError::Magic { found });
        }

        Ok(Self)
    }
}

/// A sensor frame stamped with station wall-clock time
///
/// The unit of history storage and of last-known in-memory state.
/// Timestamps are epoch seconds; `UNSET_TIMESTAMP` (-1) marks readings
/// taken before the station's clock first synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedReading {
    /// The decoded sensor report
    pub frame: SensorFrame,
    /// Epoch seconds at receipt, or -1 when the clock was unsynchronized
    pub timestamp: Timestamp,
}

impl TimestampedReading {
    /// Encoded storage record size in bytes
    pub const RECORD_SIZE: usize = SensorFrame::WIRE_SIZE + 8;

    /// Placeholder returned for "no reading yet"
    ///
    /// Callers must gate on a nonzero record count before trusting a
    /// reading; this zeroed record with the -1 sentinel is what they get
    /// otherwise.
    pub const fn placeholder() -> Self {
        Self {
            frame: SensorFrame {
                door_open: false,
                battery_millivolts: 0,
                send_attempts: 0,
                firmware_version: FirmwareVersion::from_byte(0),
            },
            timestamp: UNSET_TIMESTAMP,
        }
    }

    /// Encode into the packed 13-byte storage record
    pub fn encode(&self) -> [u8; Self::RECORD_SIZE] {
        let mut record = [0u8; Self::RECORD_SIZE];
        record[..SensorFrame::WIRE_SIZE].copy_from_slice(&self.frame.encode());
        record[SensorFrame::WIRE_SIZE..].copy_from_slice(&self.timestamp.to_le_bytes());
        record
    }

    /// Decode from a storage record
    pub fn decode(bytes: &[u8]) -> WireResult<Self> {
        if bytes.len() != Self::RECORD_SIZE {
            return Err(WireError::Length {
                expected: Self::RECORD_SIZE,
                actual: bytes.len(),
            });
        }

        let frame = SensorFrame::decode(&bytes[..SensorFrame::WIRE_SIZE])?;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[SensorFrame::WIRE_SIZE..]);

        Ok(Self {
            frame,
            timestamp: Timestamp::from_le_bytes(ts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sensor_frame_layout() {
        let frame = SensorFrame {
            door_open: true,
            battery_millivolts: 0x0FA2, // 4002 mV
            send_attempts: 7,
            firmware_version: FirmwareVersion::new(1, 3),
        };

        assert_eq!(frame.encode(), [0x01, 0xA2, 0x0F, 0x07, 0x13]);
    }

    #[test]
    fn sensor_frame_rejects_wrong_length() {
        assert_eq!(
            SensorFrame::decode(&[0; 4]),
            Err(WireError::Length { expected: 5, actual: 4 })
        );
        assert_eq!(
            SensorFrame::decode(&[0; 6]),
            Err(WireError::Length { expected: 5, actual: 6 })
        );
    }

    #[test]
    fn door_flag_accepts_any_nonzero_byte() {
        // No checksum: every bit pattern is a valid frame
        let frame = SensorFrame::decode(&[0xFF, 0, 0, 0, 0]).unwrap();
        assert!(frame.door_open);
    }

    #[test]
    fn pairing_magic_mismatch_is_not_a_pairing_frame() {
        let mut bytes = PairingFrame.encode();
        bytes[0] ^= 0x01;
        assert!(matches!(
            PairingFrame::decode(&bytes),
            Err(WireError::Magic { .. })
        ));

        assert_eq!(PairingFrame::decode(&PairingFrame.encode()), Ok(PairingFrame));
    }

    #[test]
    fn firmware_version_nibbles() {
        let v = FirmwareVersion::new(2, 9);
        assert_eq!(v.major(), 2);
        assert_eq!(v.minor(), 9);
        assert_eq!(v.as_byte(), 0x29);

        // Out-of-range components are masked, not rejected
        assert_eq!(FirmwareVersion::new(0x1F, 0x2E).as_byte(), 0xFE);
    }

    #[test]
    fn placeholder_carries_sentinel() {
        let placeholder = TimestampedReading::placeholder();
        assert_eq!(placeholder.timestamp, UNSET_TIMESTAMP);
        assert_eq!(placeholder.frame.battery_millivolts, 0);
    }

    proptest! {
        #[test]
        fn sensor_frame_round_trips(
            door in any::<bool>(),
            mv in any::<u16>(),
            attempts in any::<u8>(),
            version in any::<u8>(),
        ) {
            let frame = SensorFrame {
                door_open: door,
                battery_millivolts: mv,
                send_attempts: attempts,
                firmware_version: FirmwareVersion::from_byte(version),
            };
            prop_assert_eq!(SensorFrame::decode(&frame.encode()).unwrap(), frame);
        }

        #[test]
        fn reading_record_round_trips(mv in any::<u16>(), ts in any::<i64>()) {
            let reading = TimestampedReading {
                frame: SensorFrame::new(true, mv, FirmwareVersion::new(1, 0)),
                timestamp: ts,
            };
            prop_assert_eq!(TimestampedReading::decode(&reading.encode()).unwrap(), reading);
        }
    }
}
