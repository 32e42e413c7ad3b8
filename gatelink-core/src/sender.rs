//! Channel-Hunting Sender
//!
//! ## The problem
//!
//! The peer-to-peer radio only works when both ends sit on the same
//! channel, and the station's channel is dictated by whichever access
//! point it associated with. The sensor cannot observe that channel: it
//! wakes from deep sleep, has one frame to deliver, and only learns
//! "delivered / not delivered" per attempt. The sender therefore hunts:
//!
//! ```text
//! for channel in [1, 6, 11, 2, 3, ...]:      // most likely first
//!     bind radio to channel
//!     for attempt in 0..MAX_RETRIES_PER_CHANNEL:
//!         transmit, await completion callback
//!         delivered? -> done
//! all channels exhausted -> report failure, caller sleeps and retries
//! ```
//!
//! Worst case is `13 × 10 = 130` attempts; there is no unbounded retry and
//! no persistent send queue - the sensor's next wake cycle is the real
//! retry mechanism.
//!
//! ## Diagnostics on the wire
//!
//! The frame's attempt counter is rewritten before every transmission with
//! the attempts already consumed, so any frame after the first carries its
//! own delivery cost to the station. This couples the wire format to the
//! retry loop and is kept for protocol compatibility.
//!
//! ## Bounded completion wait
//!
//! The per-attempt wait for the driver callback is a poll loop with a
//! fixed budget ([`SendPolicy::wait_poll_budget`]). A driver that drops
//! its callback burns one attempt instead of hanging the node forever;
//! attempt accounting is unchanged by the bound.

use crate::peer::{PeerIdentity, CHANNEL_HUNT_ORDER};
use crate::transport::{Transport, TxOutcome};
use crate::wire::{PairingFrame, SensorFrame};

// Macro for optional logging; routes to whichever facade is enabled
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! log_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Attempts per channel before hunting on
pub const MAX_RETRIES_PER_CHANNEL: u8 = 10;

/// Retry and wait bounds for one send sequence
#[derive(Debug, Clone, Copy)]
pub struct SendPolicy {
    /// Attempts per channel before moving to the next one
    pub max_retries: u8,
    /// Completion polls per attempt before giving up on the callback
    pub wait_poll_budget: u32,
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES_PER_CHANNEL,
            // Generous bound; a healthy driver answers within a radio
            // round trip, orders of magnitude fewer polls than this
            wait_poll_budget: 100_000,
        }
    }
}

/// Result of one complete send sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Whether any attempt was acknowledged by the peer's radio
    pub delivered: bool,
    /// Attempts consumed across all channels actually tried
    pub attempts: u16,
}

/// Reliable-delivery wrapper around an unacknowledged radio transport
///
/// Owns the transport for the duration of a send sequence; once a
/// sequence starts it runs to delivery or exhaustion of the channel and
/// retry budget. There is no external cancellation.
pub struct ChannelHuntingSender<T: Transport> {
    transport: T,
    policy: SendPolicy,
}

impl<T: Transport> ChannelHuntingSender<T> {
    /// Wrap a transport with the default retry policy
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: SendPolicy::default(),
        }
    }

    /// Wrap a transport with an explicit policy
    pub fn with_policy(transport: T, policy: SendPolicy) -> Self {
        Self { transport, policy }
    }

    /// Give the wrapped transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Deliver one sensor status frame to `peer`
    ///
    /// Rewrites the frame's attempt counter before every transmission.
    /// Driver faults propagate as `Err`; a clean "nobody heard us" is
    /// `Ok` with `delivered == false`.
    pub fn send_frame(
        &mut self,
        mut frame: SensorFrame,
        peer: &PeerIdentity,
    ) -> Result<SendReport, T::Error> {
        self.hunt(peer, |attempts| {
            frame.send_attempts = attempts.min(u8::MAX as u16) as u8;
            frame.encode()
        })
    }

    /// Deliver one pairing frame to `peer`
    ///
    /// Pairing frames carry no attempt counter, so the payload is
    /// identical on every retry.
    pub fn send_pairing(&mut self, peer: &PeerIdentity) -> Result<SendReport, T::Error> {
        let bytes = PairingFrame.encode();
        self.hunt(peer, |_| bytes)
    }

    /// Core hunt loop shared by both frame kinds
    ///
    /// `encode` receives the attempts consumed so far and produces the
    /// exact bytes for the next transmission.
    fn hunt<const LEN: usize, F>(
        &mut self,
        peer: &PeerIdentity,
        mut encode: F,
    ) -> Result<SendReport, T::Error>
    where
        F: FnMut(u16) -> [u8; LEN],
    {
        let mut attempts: u16 = 0;

        for channel in CHANNEL_HUNT_ORDER {
            self.transport.bind(channel, peer)?;
            log_debug!("hunting on channel {} ({} attempts so far)", channel.number(), attempts);

            for _ in 0..self.policy.max_retries {
                let payload = encode(attempts);
                self.transport.transmit(&payload)?;
                attempts += 1;

                match self.await_outcome()? {
                    Some(TxOutcome::Delivered) => {
                        log_debug!(
                            "delivered to {} on channel {} after {} attempts",
                            peer,
                            channel.number(),
                            attempts
                        );
                        return Ok(SendReport {
                            delivered: true,
                            attempts,
                        });
                    }
                    // Not delivered or callback lost: burn the attempt
                    Some(TxOutcome::NotDelivered) | None => {}
                }
            }
        }

        Ok(SendReport {
            delivered: false,
            attempts,
        })
    }

    /// Block on the completion callback, bounded by the poll budget
    ///
    /// `None` means the budget ran out with no callback; the caller
    /// counts that as a failed attempt.
    fn await_outcome(&mut self) -> Result<Option<TxOutcome>, T::Error> {
        for _ in 0..self.policy.wait_poll_budget {
            match self.transport.poll_outcome() {
                Ok(outcome) => return Ok(Some(outcome)),
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }

        Ok(None)
    }
}
