//! Peer identities and radio channels
//!
//! A peer is a remote radio endpoint named by its 6-byte hardware address;
//! the transport addresses datagrams to exactly one peer at a time. The
//! radio operates on one of 13 discrete 2.4 GHz channels, and because the
//! effective channel is dictated by whatever access point the station sits
//! next to, the sender has to hunt for it (see `sender`).

use core::fmt;

/// 6-byte hardware address uniquely identifying a sensor or station radio
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity([u8; 6]);

impl PeerIdentity {
    /// The all-zero address marking a slot that was never paired
    pub const UNPAIRED: Self = Self([0; 6]);

    /// Create an identity from raw address bytes
    pub const fn new(address: [u8; 6]) -> Self {
        Self(address)
    }

    /// Raw address bytes, as stored in the persisted peer table
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// True for the all-zero "never paired" address
    pub fn is_unpaired(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PeerIdentity {
    fn format(&self, fmt: defmt::Formatter) {
        let a = &self.0;
        defmt::write!(
            fmt,
            "{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        );
    }
}

/// One of the 13 discrete radio channels (1..=13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel(u8);

/// Number of channels the radio can be bound to
pub const CHANNEL_COUNT: usize = 13;

impl Channel {
    /// Create a channel, rejecting numbers outside 1..=13
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= CHANNEL_COUNT as u8 {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Channel number as configured into the radio driver
    pub const fn number(&self) -> u8 {
        self.0
    }
}

/// Channels in hunt priority order
///
/// Consumer routers overwhelmingly auto-select 1, 6 or 11 (the three
/// non-overlapping 2.4 GHz channels), so those are tried first; the
/// remainder follow in ascending order.
pub const CHANNEL_HUNT_ORDER: [Channel; CHANNEL_COUNT] = [
    Channel(1),
    Channel(6),
    Channel(11),
    Channel(2),
    Channel(3),
    Channel(4),
    Channel(5),
    Channel(7),
    Channel(8),
    Channel(9),
    Channel(10),
    Channel(12),
    Channel(13),
];
