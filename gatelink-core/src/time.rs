//! Time abstraction for both node roles
//!
//! The station stamps every inbound reading with wall-clock time, but its
//! clock comes from NTP and may not have synchronized yet at boot. The
//! trait therefore carries an explicit synchronization flag; readings
//! taken before the first sync get the `-1` sentinel instead of a bogus
//! near-epoch timestamp.

/// Epoch seconds; [`UNSET_TIMESTAMP`] marks "no valid time"
pub type Timestamp = i64;

/// Sentinel timestamp meaning "no reading yet" or "clock never synced"
pub const UNSET_TIMESTAMP: Timestamp = -1;

/// Source of wall-clock time for the station
pub trait TimeSource {
    /// Current time in epoch seconds
    fn now(&self) -> Timestamp;

    /// Whether the source has synchronized with real wall-clock time
    ///
    /// False until e.g. the first NTP round trip completes.
    fn is_synchronized(&self) -> bool;

    /// Current time, or the sentinel while unsynchronized
    fn now_or_unset(&self) -> Timestamp {
        if self.is_synchronized() {
            self.now()
        } else {
            UNSET_TIMESTAMP
        }
    }
}

/// System clock source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as Timestamp)
            .unwrap_or(UNSET_TIMESTAMP)
    }

    fn is_synchronized(&self) -> bool {
        true
    }
}

/// Fixed clock for tests
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
    synchronized: bool,
}

impl FixedClock {
    /// Create a synchronized clock stuck at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            synchronized: true,
        }
    }

    /// Create a clock that has never reached its time server
    pub fn unsynchronized() -> Self {
        Self {
            timestamp: 0,
            synchronized: false,
        }
    }

    /// Move the clock to an absolute time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock by `seconds`
    pub fn advance(&mut self, seconds: i64) {
        self.timestamp += seconds;
    }

    /// Mark the clock as synchronized (simulates the first NTP callback)
    pub fn mark_synchronized(&mut self) {
        self.synchronized = true;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_synchronized(&self) -> bool {
        self.synchronized
    }
}
