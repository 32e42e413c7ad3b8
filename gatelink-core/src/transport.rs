//! Radio Transport Adapter Seam
//!
//! ## Overview
//!
//! Wraps whatever proprietary low-power peer-to-peer radio the hardware
//! provides behind a minimal trait: bind the driver to a channel and peer,
//! start one atomic datagram, poll for the driver's completion callback.
//!
//! ## Non-blocking model
//!
//! The real driver reports delivery from interrupt context through a
//! registered callback. That callback is surfaced here as a poll using
//! `nb::Result`, the embedded-HAL convention:
//!
//! - `Err(nb::Error::WouldBlock)` - the callback has not fired yet
//! - `Ok(TxOutcome)` - the driver reported delivered / not delivered
//! - `Err(nb::Error::Other(e))` - the driver itself faulted
//!
//! The transport guarantees atomicity per datagram (a frame is delivered
//! whole or not at all) and nothing else: no payload integrity beyond its
//! own framing, no acknowledgement of what the receiver did with the data.

use crate::peer::{Channel, PeerIdentity};

/// Per-datagram completion outcome reported by the radio driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// The peer's radio acknowledged the datagram
    Delivered,
    /// No acknowledgement; wrong channel, peer asleep, or interference
    NotDelivered,
}

/// Low-level radio send primitive
///
/// Implementations wrap a concrete driver. One transmission is in flight
/// at a time: `transmit` starts it, `poll_outcome` completes it.
pub trait Transport {
    /// Driver-level fault type (distinct from a clean NotDelivered)
    type Error;

    /// Reinitialize the driver bound to `channel`, addressing `peer`
    fn bind(&mut self, channel: Channel, peer: &PeerIdentity) -> Result<(), Self::Error>;

    /// Start transmitting one atomic datagram to the bound peer
    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Poll for the completion callback of the in-flight datagram
    fn poll_outcome(&mut self) -> nb::Result<TxOutcome, Self::Error>;
}

/// Scripted transport double for exercising the sender without hardware
///
/// Plays back a fixed sequence of per-attempt outcomes and records every
/// bind and transmitted payload for inspection.
#[cfg(feature = "std")]
pub struct ScriptedTransport {
    script: std::vec::Vec<ScriptStep>,
    cursor: usize,
    pending: Option<ScriptStep>,
    /// Behavior once the script runs out
    default_deliver: bool,
    /// Every (channel, peer) the sender bound, in order
    pub binds: std::vec::Vec<(Channel, PeerIdentity)>,
    /// Every payload handed to `transmit`, in order
    pub sent: std::vec::Vec<std::vec::Vec<u8>>,
}

/// One scripted per-attempt behavior
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Completion callback fires with delivered
    Deliver,
    /// Completion callback fires with not-delivered
    Fail,
    /// Completion callback never fires (dropped by the driver)
    Hang,
}

#[cfg(feature = "std")]
impl ScriptedTransport {
    /// Transport that plays back `script`, then fails every later attempt
    pub fn new(script: std::vec::Vec<ScriptStep>) -> Self {
        Self {
            script,
            cursor: 0,
            pending: None,
            default_deliver: false,
            binds: std::vec::Vec::new(),
            sent: std::vec::Vec::new(),
        }
    }

    /// Transport whose every attempt is delivered
    pub fn always_delivered() -> Self {
        let mut transport = Self::new(std::vec::Vec::new());
        transport.default_deliver = true;
        transport
    }

    /// Transport that fails `failures` attempts, then delivers
    pub fn fail_then_deliver(failures: usize) -> Self {
        let mut script = std::vec![ScriptStep::Fail; failures];
        script.push(ScriptStep::Deliver);
        Self::new(script)
    }
}

#[cfg(feature = "std")]
impl Transport for ScriptedTransport {
    type Error = core::convert::Infallible;

    fn bind(&mut self, channel: Channel, peer: &PeerIdentity) -> Result<(), Self::Error> {
        self.binds.push((channel, *peer));
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.sent.push(frame.to_vec());
        let step = self.script.get(self.cursor).copied().unwrap_or(if self.default_deliver {
            ScriptStep::Deliver
        } else {
            ScriptStep::Fail
        });
        self.cursor += 1;
        self.pending = Some(step);
        Ok(())
    }

    fn poll_outcome(&mut self) -> nb::Result<TxOutcome, Self::Error> {
        match self.pending {
            Some(ScriptStep::Deliver) => {
                self.pending = None;
                Ok(TxOutcome::Delivered)
            }
            Some(ScriptStep::Fail) => {
                self.pending = None;
                Ok(TxOutcome::NotDelivered)
            }
            Some(ScriptStep::Hang) => Err(nb::Error::WouldBlock),
            // Nothing in flight; the driver never answers
            None => Err(nb::Error::WouldBlock),
        }
    }
}
