//! Aggregator / Dispatcher for Inbound Frames
//!
//! ## Overview
//!
//! One [`Station`] value owns everything the indoor station knows: the
//! paired peer table, per-slot last-known readings, the pairing state
//! machine, the history store, and the clock. The radio receive callback
//! feeds raw payloads into [`Station::handle_frame`]; decisions come back
//! as a [`Dispatch`] and side effects flow out through the LED and event
//! sink seams.
//!
//! ## Per-slot state machine
//!
//! ```text
//!            frame from paired address
//!   NoData ──────────────────────────────> Known(last_reading)
//!                                            │        ▲
//!                                            └────────┘
//!                                       every further frame
//! ```
//!
//! Frames from unknown addresses are logged, published as diagnostics,
//! and dropped - there is no negotiation channel to do anything else with
//! them.
//!
//! ## Pairing
//!
//! `Idle ⇄ AwaitingSensor(slot)`, armed explicitly per slot (web request)
//! or cycled through the slots (hardware button). While armed, the next
//! valid pairing frame writes its sender address into the slot and
//! persists the table; the last pairing frame wins, and no timeout
//! disarms the state. Both properties are deliberate.
//!
//! ## Failure policy
//!
//! Storage faults during dispatch are logged and swallowed: a reading
//! that cannot be persisted still updates the in-memory state, drives the
//! LEDs and reaches the UI. The station keeps running; history gets a
//! hole. (There is no way to signal the sensor anyway - the radio ack
//! only confirms delivery, never storage.)

use gatelink_core::{battery, PeerIdentity, SensorFrame, TimeSource, TimestampedReading};
use gatelink_core::wire::PairingFrame;

use crate::events::{EventSink, LedDriver, StationEvent};
use crate::history::{HistoryStore, StoreError};
use crate::storage::Storage;

// Macros for optional logging; route to whichever facade is enabled
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! log_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! log_info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

/// Pairing sub-state of the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// No slot armed; pairing frames are ignored
    Idle,
    /// The named slot takes the next pairing frame's sender address
    AwaitingSensor(u8),
}

/// What `handle_frame` did with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Sensor frame attributed to a paired slot and processed
    Reading {
        /// Slot the reading was attributed to
        slot: u8,
    },
    /// Pairing frame consumed; the slot is now paired to the sender
    Paired {
        /// Slot that learned a new peer address
        slot: u8,
    },
    /// Valid pairing frame while no slot was armed; ignored
    Ignored,
    /// Sensor frame from an address matching no paired slot; dropped
    Unknown,
    /// Payload decoded as neither frame kind; dropped
    Malformed,
}

/// The indoor station's entire mutable state
///
/// Owned by the single main-loop context; nothing in here is shared, so
/// no locking discipline is required in a single-threaded embedding.
pub struct Station<S: Storage, C: TimeSource, const SLOTS: usize, const CAP: usize> {
    history: HistoryStore<S, SLOTS, CAP>,
    clock: C,
    peers: [PeerIdentity; SLOTS],
    latest: [Option<TimestampedReading>; SLOTS],
    pairing: PairingState,
}

impl<S: Storage, C: TimeSource, const SLOTS: usize, const CAP: usize> Station<S, C, SLOTS, CAP> {
    /// Open the station state over a storage medium
    ///
    /// Loads the persisted peer table and warms the in-memory last-known
    /// readings from history, so a reboot does not blank the display.
    pub fn open(storage: S, clock: C) -> Result<Self, StoreError> {
        let mut history = HistoryStore::open(storage)?;
        let peers = history.load_peers();

        let mut latest: [Option<TimestampedReading>; SLOTS] = [None; SLOTS];
        for (slot, last) in latest.iter_mut().enumerate() {
            if history.count(slot) > 0 {
                *last = Some(history.read_latest(slot));
            }
        }

        Ok(Self {
            history,
            clock,
            peers,
            latest,
            pairing: PairingState::Idle,
        })
    }

    /// Dispatch one raw inbound payload from `sender`
    pub fn handle_frame(
        &mut self,
        sender: PeerIdentity,
        payload: &[u8],
        leds: &mut impl LedDriver,
        sink: &mut impl EventSink,
    ) -> Dispatch {
        if payload.len() == PairingFrame::WIRE_SIZE {
            return match PairingFrame::decode(payload) {
                Ok(_) => self.handle_pairing_frame(sender, sink),
                // Right length, wrong magic: not a pairing frame, drop it
                Err(_) => Dispatch::Malformed,
            };
        }

        match SensorFrame::decode(payload) {
            Ok(frame) => self.handle_sensor_frame(sender, frame, leds, sink),
            Err(_e) => {
                log_warn!("dropping malformed frame from {}: {}", sender, _e);
                Dispatch::Malformed
            }
        }
    }

    fn handle_pairing_frame(&mut self, sender: PeerIdentity, sink: &mut impl EventSink) -> Dispatch {
        let PairingState::AwaitingSensor(slot) = self.pairing else {
            log_info!("pairing frame from {} while idle, ignoring", sender);
            return Dispatch::Ignored;
        };

        // Last pairing frame wins; re-pairing simply overwrites
        self.peers[slot as usize] = sender;
        if let Err(_e) = self.history.save_peers(&self.peers) {
            log_warn!("pairing persisted only in memory: {}", _e);
        }
        log_info!("slot {} paired to {}", slot, sender);

        self.pairing = PairingState::Idle;
        sink.publish(&StationEvent::PairingStatus {
            active: false,
            slot: None,
        });

        Dispatch::Paired { slot }
    }

    fn handle_sensor_frame(
        &mut self,
        sender: PeerIdentity,
        frame: SensorFrame,
        leds: &mut impl LedDriver,
        sink: &mut impl EventSink,
    ) -> Dispatch {
        let Some(slot) = self.slot_of(&sender) else {
            log_warn!("reading from unknown sensor {}, dropping", sender);
            sink.publish(&StationEvent::UnknownSender { address: sender });
            return Dispatch::Unknown;
        };

        let reading = TimestampedReading {
            frame,
            timestamp: self.clock.now_or_unset(),
        };

        // Fail soft: an unpersisted reading still reaches LEDs and UI
        if let Err(_e) = self.history.append(slot, &reading) {
            log_warn!("history append failed for slot {}: {}", slot, _e);
        }
        self.latest[slot] = Some(reading);

        let battery_percent = battery::voltage_to_percent(frame.battery_millivolts);
        let battery_low = battery::is_empty(frame.battery_millivolts);

        leds.set_sensor_status(slot as u8, frame.door_open, battery_low);
        sink.publish(&StationEvent::ReadingChanged {
            slot: slot as u8,
            door_open: frame.door_open,
            battery_percent,
            battery_low,
            timestamp: reading.timestamp,
        });

        Dispatch::Reading { slot: slot as u8 }
    }

    /// Arm pairing for `slot`; an out-of-range slot disarms instead
    pub fn start_pairing(&mut self, slot: usize, sink: &mut impl EventSink) {
        if slot >= SLOTS {
            self.stop_pairing(sink);
            return;
        }

        self.pairing = PairingState::AwaitingSensor(slot as u8);
        sink.publish(&StationEvent::PairingStatus {
            active: true,
            slot: Some(slot as u8),
        });
    }

    /// Disarm pairing
    pub fn stop_pairing(&mut self, sink: &mut impl EventSink) {
        self.pairing = PairingState::Idle;
        sink.publish(&StationEvent::PairingStatus {
            active: false,
            slot: None,
        });
    }

    /// Cycle pairing: idle → slot 0 → slot 1 → … → idle
    ///
    /// This is the hardware button behavior.
    pub fn advance_pairing(&mut self, sink: &mut impl EventSink) {
        match self.pairing {
            PairingState::Idle => self.start_pairing(0, sink),
            PairingState::AwaitingSensor(slot) => self.start_pairing(slot as usize + 1, sink),
        }
    }

    /// Current pairing state
    pub fn pairing_state(&self) -> PairingState {
        self.pairing
    }

    /// Last-known reading for a slot, if any ever arrived
    pub fn latest(&self, slot: usize) -> Option<&TimestampedReading> {
        self.latest.get(slot).and_then(|r| r.as_ref())
    }

    /// Battery level of a slot's last-known reading, from the discharge curve
    ///
    /// `None` until the slot has reported at least once.
    pub fn battery_percent_of(&self, slot: usize) -> Option<f32> {
        self.latest(slot)
            .map(|reading| battery::voltage_to_percent(reading.frame.battery_millivolts))
    }

    /// Configured peer for a slot (`UNPAIRED` when never paired)
    pub fn peer(&self, slot: usize) -> Option<&PeerIdentity> {
        self.peers.get(slot)
    }

    /// History access for UI handlers (charts, tables)
    pub fn history_mut(&mut self) -> &mut HistoryStore<S, SLOTS, CAP> {
        &mut self.history
    }

    /// Tear the station down into its store and clock (e.g. shutdown)
    pub fn into_parts(self) -> (HistoryStore<S, SLOTS, CAP>, C) {
        (self.history, self.clock)
    }

    /// User "remove data" action: drop one slot's history
    pub fn erase_slot(&mut self, slot: usize) -> Result<(), StoreError> {
        self.history.erase_slot(slot)?;
        if let Some(last) = self.latest.get_mut(slot) {
            *last = None;
        }
        Ok(())
    }

    /// Factory reset: forget all peers, erase all history, LEDs dark
    pub fn factory_reset(&mut self, leds: &mut impl LedDriver) -> Result<(), StoreError> {
        self.history.erase_all()?;
        self.peers = [PeerIdentity::UNPAIRED; SLOTS];
        self.latest = [None; SLOTS];
        self.pairing = PairingState::Idle;

        for slot in 0..SLOTS {
            leds.set_off(slot as u8);
        }
        Ok(())
    }

    fn slot_of(&self, sender: &PeerIdentity) -> Option<usize> {
        self.peers
            .iter()
            .position(|peer| !peer.is_unpaired() && peer == sender)
    }
}
