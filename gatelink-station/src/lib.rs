//! Indoor station side of the GateLink telemetry link
//!
//! Receives the compact frames defined in `gatelink-core`, matches them to
//! paired sensors, persists a bounded per-sensor history, and pushes
//! normalized events to the LED driver and the web UI.
//!
//! The station is single-threaded by design: every piece of state lives in
//! one [`Station`] value owned by the main loop, and the storage layer is
//! only ever touched from that context. A multi-threaded embedding must
//! serialize all access to the station itself.
//!
//! ```no_run
//! use gatelink_station::{Station, storage::MemoryStorage};
//! use gatelink_core::{FixedClock, PeerIdentity};
//! # use gatelink_station::events::{NullLeds, NullSink};
//!
//! // 2 sensor slots, 25 history records each
//! let storage = MemoryStorage::<2048>::new();
//! let clock = FixedClock::new(1_700_000_000);
//! let mut station = Station::<_, _, 2, 25>::open(storage, clock).unwrap();
//!
//! let mut leds = NullLeds;
//! let mut sink = NullSink;
//!
//! // Pair slot 0 against the next sensor that announces itself
//! station.start_pairing(0, &mut sink);
//!
//! // Radio receive callback hands frames in here
//! let sensor = PeerIdentity::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
//! station.handle_frame(sensor, &[0x52, 0x49, 0x41, 0x50], &mut leds, &mut sink);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod events;
pub mod history;
pub mod station;
pub mod storage;

// Public API
pub use events::{EventSink, LedDriver, StationEvent};
pub use history::{HistoryStore, StoreError};
pub use station::{Dispatch, PairingState, Station};
pub use storage::{MemoryStorage, Storage, StorageError};

#[cfg(feature = "std")]
pub use storage::FileStorage;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
