//! Byte-Addressable Persistent Storage Seam
//!
//! ## Overview
//!
//! The history store does not talk to a filesystem or an EEPROM driver
//! directly; it reads and writes byte ranges of one fixed-capacity blob
//! through the [`Storage`] trait. That keeps the store itself `no_std`,
//! deterministic, and trivially testable, while the blob can live in a
//! RAM-shadowed EEPROM page, a raw flash partition, or (under `std`) a
//! plain file.
//!
//! ## Failure policy
//!
//! Storage faults are surfaced as small `Copy` errors and never retried
//! at this layer. The layers above fail soft: an append that cannot be
//! persisted is logged and dropped, reads degrade to "no data". On an
//! unattended device that policy trades silent data loss for staying
//! alive, and the trade is deliberate.

use thiserror_no_std::Error;

/// Storage-layer errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Byte range falls outside the blob
    #[error("Range at offset {offset} (len {len}) exceeds capacity {capacity}")]
    OutOfBounds {
        /// Start of the requested range
        offset: usize,
        /// Length of the requested range
        len: usize,
        /// Total blob capacity
        capacity: usize,
    },

    /// Backing medium failed (unmounted filesystem, short write, I/O fault)
    #[error("Backing storage I/O failure")]
    Io,
}

#[cfg(feature = "defmt")]
impl defmt::Format for StorageError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::OutOfBounds { offset, len, capacity } =>
                defmt::write!(fmt, "Range {}+{} exceeds capacity {}", offset, len, capacity),
            Self::Io => defmt::write!(fmt, "Storage I/O failure"),
        }
    }
}

/// A fixed-capacity, byte-addressable persistence medium
pub trait Storage {
    /// Total usable bytes
    fn capacity(&self) -> usize;

    /// Fill `buf` from the blob starting at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` into the blob starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

fn check_range(offset: usize, len: usize, capacity: usize) -> Result<(), StorageError> {
    if offset.checked_add(len).map_or(true, |end| end > capacity) {
        return Err(StorageError::OutOfBounds {
            offset,
            len,
            capacity,
        });
    }
    Ok(())
}

/// Array-backed storage
///
/// The `no_std` default: models a RAM-shadowed EEPROM page and backs all
/// unit tests. Starts zero-filled, which the history store reads as
/// "never formatted".
pub struct MemoryStorage<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> MemoryStorage<N> {
    /// Create a zero-filled blob
    pub const fn new() -> Self {
        Self { bytes: [0; N] }
    }
}

impl<const N: usize> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Storage for MemoryStorage<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_range(offset, buf.len(), N)?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_range(offset, data.len(), N)?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// File-backed storage (requires std)
///
/// One fixed-size backing file, zero-filled on first open so a fresh file
/// behaves exactly like a fresh EEPROM.
#[cfg(feature = "std")]
pub struct FileStorage {
    file: std::fs::File,
    capacity: usize,
}

#[cfg(feature = "std")]
impl FileStorage {
    /// Open (or create and zero-fill) `path` with `capacity` bytes
    pub fn open(path: &std::path::Path, capacity: usize) -> Result<Self, StorageError> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|_| StorageError::Io)?;

        let current_len = file.metadata().map_err(|_| StorageError::Io)?.len();
        if current_len < capacity as u64 {
            file.set_len(capacity as u64).map_err(|_| StorageError::Io)?;
        }

        Ok(Self { file, capacity })
    }
}

#[cfg(feature = "std")]
impl Storage for FileStorage {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        use std::io::{Read, Seek, SeekFrom};

        check_range(offset, buf.len(), self.capacity)?;
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|_| StorageError::Io)?;
        self.file.read_exact(buf).map_err(|_| StorageError::Io)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        use std::io::{Seek, SeekFrom, Write};

        check_range(offset, data.len(), self.capacity)?;
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|_| StorageError::Io)?;
        self.file.write_all(data).map_err(|_| StorageError::Io)
    }
}
