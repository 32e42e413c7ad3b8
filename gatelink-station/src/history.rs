//! Bounded Per-Sensor History Store
//!
//! ## Overview
//!
//! Durable, append-only history of timestamped readings for every sensor
//! slot, plus the persisted peer table, all packed into one byte blob on
//! a [`Storage`](crate::storage::Storage) medium.
//!
//! ## Chosen variant: ring buffer in a single blob
//!
//! Two designs existed for this store: a grow-until-full file per sensor,
//! and a fixed-capacity ring per slot inside one persisted struct. This
//! implementation is the ring variant: capacity is `CAP` records per slot,
//! eviction is newest-overwrites-oldest, and resource use is bounded and
//! known at compile time. The file-per-sensor semantics are not mixed in.
//!
//! ## Blob layout
//!
//! All integers little-endian:
//!
//! ```text
//! ┌────────────┬─────────┬──────────────┬───────────────────┬─────────────────────────┐
//! │ magic u32  │ ver u8  │ peer table   │ index table       │ records                 │
//! │ "GLNK"     │ 1       │ SLOTS × 6 B  │ SLOTS × {pos u16, │ SLOTS × CAP × 13 B      │
//! │            │         │              │         len u16}  │ (slot-major, ring order)│
//! └────────────┴─────────┴──────────────┴───────────────────┴─────────────────────────┘
//! ```
//!
//! The ring indices mirror a classic circular buffer: `pos` is the next
//! write slot, `len` saturates at `CAP`, and the oldest record sits at
//! `pos` once the ring has wrapped.
//!
//! ## Failure policy
//!
//! `append` and the erase operations surface storage faults as errors;
//! the read side fails soft (zero count, empty vector, sentinel record)
//! so an unattended station keeps running on a flaky medium. Records
//! carry no checksum - that is a property of the persisted format, kept
//! for compatibility with the wire records.

use gatelink_core::{PeerIdentity, TimestampedReading};
use thiserror_no_std::Error;

use crate::storage::{Storage, StorageError};

// Macro for optional logging; routes to whichever facade is enabled
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

/// Store-level errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Sensor slot index outside 0..SLOTS
    #[error("Slot {slot} outside the {slots} supported slots")]
    BadSlot {
        /// The offending index
        slot: usize,
        /// Number of configured slots
        slots: usize,
    },

    /// The storage medium cannot hold the configured layout
    #[error("Storage holds {capacity} bytes, layout needs {required}")]
    StorageTooSmall {
        /// Bytes the layout requires
        required: usize,
        /// Bytes the medium provides
        capacity: usize,
    },

    /// Fault from the backing storage
    #[error("Storage fault: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(feature = "defmt")]
impl defmt::Format for StoreError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::BadSlot { slot, slots } =>
                defmt::write!(fmt, "Slot {} outside the {} supported slots", slot, slots),
            Self::StorageTooSmall { required, capacity } =>
                defmt::write!(fmt, "Storage holds {} bytes, layout needs {}", capacity, required),
            Self::Storage(e) => defmt::write!(fmt, "Storage fault: {}", e),
        }
    }
}

const MAGIC: u32 = u32::from_le_bytes(*b"GLNK");
const LAYOUT_VERSION: u8 = 1;
const HEADER_SIZE: usize = 5;
const PEER_SIZE: usize = 6;
const INDEX_ENTRY_SIZE: usize = 4;

/// Bounded history store over a byte-addressable medium
///
/// `SLOTS` is the number of supported sensors, `CAP` the ring capacity in
/// records per slot. Construction fails when the medium is smaller than
/// the resulting layout.
pub struct HistoryStore<S: Storage, const SLOTS: usize, const CAP: usize> {
    storage: S,
}

impl<S: Storage, const SLOTS: usize, const CAP: usize> HistoryStore<S, SLOTS, CAP> {
    const PEER_TABLE_OFFSET: usize = HEADER_SIZE;
    const INDEX_TABLE_OFFSET: usize = Self::PEER_TABLE_OFFSET + SLOTS * PEER_SIZE;
    const RECORDS_OFFSET: usize = Self::INDEX_TABLE_OFFSET + SLOTS * INDEX_ENTRY_SIZE;

    /// Total bytes the layout occupies on the medium
    pub const REQUIRED_CAPACITY: usize =
        Self::RECORDS_OFFSET + SLOTS * CAP * TimestampedReading::RECORD_SIZE;

    /// Open the store, formatting the medium on first use
    ///
    /// A missing or foreign magic number (fresh EEPROM, layout change)
    /// triggers a format; matching state is kept as-is.
    pub fn open(storage: S) -> Result<Self, StoreError> {
        if storage.capacity() < Self::REQUIRED_CAPACITY {
            return Err(StoreError::StorageTooSmall {
                required: Self::REQUIRED_CAPACITY,
                capacity: storage.capacity(),
            });
        }

        let mut store = Self { storage };

        let mut header = [0u8; HEADER_SIZE];
        store.storage.read(0, &mut header)?;
        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);

        if magic != MAGIC || header[4] != LAYOUT_VERSION {
            log_warn!("history blob unformatted or foreign layout, formatting");
            store.format()?;
        }

        Ok(store)
    }

    /// Write a blank layout: magic, zeroed peer table, zeroed ring indices
    pub fn format(&mut self) -> Result<(), StoreError> {
        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4] = LAYOUT_VERSION;
        self.storage.write(0, &header)?;

        self.save_peers(&[PeerIdentity::UNPAIRED; SLOTS])?;
        for slot in 0..SLOTS {
            self.write_index(slot, 0, 0)?;
        }
        Ok(())
    }

    /// Append one reading to a slot's ring, evicting the oldest when full
    pub fn append(&mut self, slot: usize, reading: &TimestampedReading) -> Result<(), StoreError> {
        self.check_slot(slot)?;
        let (pos, len) = self.read_index(slot)?;

        self.storage
            .write(Self::record_offset(slot, pos as usize), &reading.encode())?;

        let next_pos = (pos as usize + 1) % CAP;
        let next_len = core::cmp::min(len as usize + 1, CAP);
        self.write_index(slot, next_pos as u16, next_len as u16)?;
        Ok(())
    }

    /// Number of stored readings for a slot, `min(appends, CAP)`
    ///
    /// Fails soft: a storage fault or bad slot reads as zero.
    pub fn count(&mut self, slot: usize) -> u16 {
        if slot >= SLOTS {
            return 0;
        }
        match self.read_index(slot) {
            Ok((_, len)) => len,
            Err(_) => {
                log_warn!("count({}): storage fault, reporting empty", slot);
                0
            }
        }
    }

    /// All readings for a slot, oldest first
    ///
    /// Fails soft: faults truncate the result rather than erroring.
    pub fn read_all(&mut self, slot: usize) -> heapless::Vec<TimestampedReading, CAP> {
        let mut readings = heapless::Vec::new();
        if slot >= SLOTS {
            return readings;
        }

        let (pos, len) = match self.read_index(slot) {
            Ok(index) => index,
            Err(_) => return readings,
        };

        for logical in 0..len as usize {
            // Once wrapped, the oldest record sits at the write position
            let physical = if (len as usize) < CAP {
                logical
            } else {
                (pos as usize + logical) % CAP
            };

            match self.read_record(slot, physical) {
                Ok(reading) => {
                    if readings.push(reading).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    log_warn!("read_all({}): storage fault at record {}", slot, logical);
                    break;
                }
            }
        }

        readings
    }

    /// Most recent reading for a slot
    ///
    /// When the slot is empty (or on a storage fault) this returns the
    /// zeroed placeholder with the `-1` sentinel timestamp; callers must
    /// gate on `count(slot) > 0` before trusting the value.
    pub fn read_latest(&mut self, slot: usize) -> TimestampedReading {
        if slot >= SLOTS {
            return TimestampedReading::placeholder();
        }

        let (pos, len) = match self.read_index(slot) {
            Ok(index) => index,
            Err(_) => return TimestampedReading::placeholder(),
        };
        if len == 0 {
            return TimestampedReading::placeholder();
        }

        let latest = if pos == 0 { CAP - 1 } else { pos as usize - 1 };
        self.read_record(slot, latest)
            .unwrap_or_else(|_| TimestampedReading::placeholder())
    }

    /// Drop all history for one slot; irreversible
    pub fn erase_slot(&mut self, slot: usize) -> Result<(), StoreError> {
        self.check_slot(slot)?;
        self.write_index(slot, 0, 0)
    }

    /// Factory reset: drop all history and forget every paired peer
    pub fn erase_all(&mut self) -> Result<(), StoreError> {
        for slot in 0..SLOTS {
            self.write_index(slot, 0, 0)?;
        }
        self.save_peers(&[PeerIdentity::UNPAIRED; SLOTS])
    }

    /// Persist the peer table (`SLOTS × 6` bytes, independent of history)
    pub fn save_peers(&mut self, peers: &[PeerIdentity; SLOTS]) -> Result<(), StoreError> {
        for (slot, peer) in peers.iter().enumerate() {
            self.storage
                .write(Self::PEER_TABLE_OFFSET + slot * PEER_SIZE, peer.as_bytes())?;
        }
        Ok(())
    }

    /// Load the persisted peer table
    ///
    /// Fails soft: a fault reads as an all-unpaired table.
    pub fn load_peers(&mut self) -> [PeerIdentity; SLOTS] {
        let mut peers = [PeerIdentity::UNPAIRED; SLOTS];
        for (slot, peer) in peers.iter_mut().enumerate() {
            let mut address = [0u8; PEER_SIZE];
            match self
                .storage
                .read(Self::PEER_TABLE_OFFSET + slot * PEER_SIZE, &mut address)
            {
                Ok(()) => *peer = PeerIdentity::new(address),
                Err(_) => {
                    log_warn!("load_peers: storage fault, slot {} unpaired", slot);
                }
            }
        }
        peers
    }

    /// Hand the backing medium back (e.g. to close or reopen it)
    pub fn into_storage(self) -> S {
        self.storage
    }

    const fn record_offset(slot: usize, pos: usize) -> usize {
        Self::RECORDS_OFFSET + (slot * CAP + pos) * TimestampedReading::RECORD_SIZE
    }

    fn check_slot(&self, slot: usize) -> Result<(), StoreError> {
        if slot >= SLOTS {
            return Err(StoreError::BadSlot { slot, slots: SLOTS });
        }
        Ok(())
    }

    fn read_index(&mut self, slot: usize) -> Result<(u16, u16), StorageError> {
        let mut entry = [0u8; INDEX_ENTRY_SIZE];
        self.storage
            .read(Self::INDEX_TABLE_OFFSET + slot * INDEX_ENTRY_SIZE, &mut entry)?;
        Ok((
            u16::from_le_bytes([entry[0], entry[1]]),
            u16::from_le_bytes([entry[2], entry[3]]),
        ))
    }

    fn write_index(&mut self, slot: usize, pos: u16, len: u16) -> Result<(), StoreError> {
        let mut entry = [0u8; INDEX_ENTRY_SIZE];
        entry[..2].copy_from_slice(&pos.to_le_bytes());
        entry[2..].copy_from_slice(&len.to_le_bytes());
        self.storage
            .write(Self::INDEX_TABLE_OFFSET + slot * INDEX_ENTRY_SIZE, &entry)?;
        Ok(())
    }

    fn read_record(&mut self, slot: usize, pos: usize) -> Result<TimestampedReading, StoreError> {
        let mut record = [0u8; TimestampedReading::RECORD_SIZE];
        self.storage
            .read(Self::record_offset(slot, pos), &mut record)?;
        // Record bytes always decode; only a length mismatch can fail,
        // and the buffer is sized by construction
        Ok(TimestampedReading::decode(&record).unwrap_or_else(|_| TimestampedReading::placeholder()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use gatelink_core::{FirmwareVersion, SensorFrame, UNSET_TIMESTAMP};

    const SLOTS: usize = 2;
    const CAP: usize = 4;
    type TestStore = HistoryStore<MemoryStorage<4096>, SLOTS, CAP>;

    fn store() -> TestStore {
        TestStore::open(MemoryStorage::new()).unwrap()
    }

    fn reading(mv: u16, timestamp: i64) -> TimestampedReading {
        TimestampedReading {
            frame: SensorFrame::new(true, mv, FirmwareVersion::new(1, 0)),
            timestamp,
        }
    }

    #[test]
    fn rejects_undersized_storage() {
        let result = HistoryStore::<_, 2, 25>::open(MemoryStorage::<64>::new());
        assert!(matches!(result, Err(StoreError::StorageTooSmall { .. })));
    }

    #[test]
    fn fresh_store_is_empty() {
        let mut store = store();
        for slot in 0..SLOTS {
            assert_eq!(store.count(slot), 0);
            assert!(store.read_all(slot).is_empty());
            assert_eq!(store.read_latest(slot).timestamp, UNSET_TIMESTAMP);
        }
    }

    #[test]
    fn append_then_read_latest_round_trips() {
        let mut store = store();
        let r = reading(3812, 1_700_000_123);

        store.append(0, &r).unwrap();
        assert_eq!(store.count(0), 1);
        assert_eq!(store.read_latest(0), r);

        // The other slot is untouched
        assert_eq!(store.count(1), 0);
    }

    #[test]
    fn count_tracks_appends_up_to_capacity() {
        let mut store = store();
        for i in 0..7 {
            store.append(0, &reading(3000 + i, i as i64)).unwrap();
            assert_eq!(store.count(0) as usize, core::cmp::min(i as usize + 1, CAP));
        }
    }

    #[test]
    fn ring_keeps_newest_records_in_order() {
        let mut store = store();
        for i in 0..6u16 {
            store.append(0, &reading(3000 + i, 1000 + i as i64)).unwrap();
        }

        // Capacity 4: readings 2..=5 survive, oldest first
        let all = store.read_all(0);
        let timestamps: heapless::Vec<i64, CAP> = all.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps.as_slice(), &[1002, 1003, 1004, 1005]);
        assert_eq!(store.read_latest(0).timestamp, 1005);
    }

    #[test]
    fn slots_are_independent() {
        let mut store = store();
        store.append(0, &reading(3100, 10)).unwrap();
        store.append(1, &reading(4100, 20)).unwrap();

        assert_eq!(store.read_latest(0).frame.battery_millivolts, 3100);
        assert_eq!(store.read_latest(1).frame.battery_millivolts, 4100);
    }

    #[test]
    fn erase_one_slot_leaves_the_other() {
        let mut store = store();
        store.append(0, &reading(3100, 10)).unwrap();
        store.append(1, &reading(4100, 20)).unwrap();

        store.erase_slot(0).unwrap();
        assert_eq!(store.count(0), 0);
        assert_eq!(store.read_latest(0).timestamp, UNSET_TIMESTAMP);
        assert_eq!(store.count(1), 1);
    }

    #[test]
    fn erase_all_clears_history_and_peers() {
        let mut store = store();
        store.append(0, &reading(3100, 10)).unwrap();
        store
            .save_peers(&[
                PeerIdentity::new([1, 2, 3, 4, 5, 6]),
                PeerIdentity::new([7, 8, 9, 10, 11, 12]),
            ])
            .unwrap();

        store.erase_all().unwrap();
        assert_eq!(store.count(0), 0);
        assert!(store.load_peers().iter().all(|p| p.is_unpaired()));
    }

    #[test]
    fn bad_slot_is_rejected_on_append_and_soft_on_reads() {
        let mut store = store();
        assert!(matches!(
            store.append(SLOTS, &reading(3000, 0)),
            Err(StoreError::BadSlot { .. })
        ));
        assert_eq!(store.count(SLOTS), 0);
        assert!(store.read_all(SLOTS).is_empty());
        assert_eq!(store.read_latest(SLOTS).timestamp, UNSET_TIMESTAMP);
    }

    #[test]
    fn contents_survive_reopen() {
        let mut store = store();
        store.append(0, &reading(3775, 42)).unwrap();
        store
            .save_peers(&[PeerIdentity::new([1, 2, 3, 4, 5, 6]), PeerIdentity::UNPAIRED])
            .unwrap();

        // Same blob, fresh store: magic matches, nothing is reformatted
        let storage = store.into_storage();
        let mut reopened = TestStore::open(storage).unwrap();
        assert_eq!(reopened.count(0), 1);
        assert_eq!(reopened.read_latest(0).timestamp, 42);
        assert_eq!(reopened.load_peers()[0], PeerIdentity::new([1, 2, 3, 4, 5, 6]));
    }

    #[cfg(feature = "std")]
    #[test]
    fn file_backed_store_round_trips() {
        use crate::storage::FileStorage;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.bin");
        let capacity = TestStore::REQUIRED_CAPACITY;

        {
            let storage = FileStorage::open(&path, capacity).unwrap();
            let mut store = HistoryStore::<_, SLOTS, CAP>::open(storage).unwrap();
            store.append(1, &reading(3990, 777)).unwrap();
        }

        let storage = FileStorage::open(&path, capacity).unwrap();
        let mut store = HistoryStore::<_, SLOTS, CAP>::open(storage).unwrap();
        assert_eq!(store.count(1), 1);
        assert_eq!(store.read_latest(1).frame.battery_millivolts, 3990);
    }
}
