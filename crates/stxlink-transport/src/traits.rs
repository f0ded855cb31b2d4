use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Positive acknowledgment byte.
pub const ACK_BYTE: u8 = 0x06;

/// Negative acknowledgment byte.
pub const NACK_BYTE: u8 = 0x15;

/// Acknowledgment kind carried on the channel's out-of-band path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    /// Frame received and validated.
    Ack,
    /// Frame received but rejected (bad checksum or terminator).
    Nack,
}

impl AckKind {
    /// Wire value of this acknowledgment.
    pub fn as_byte(self) -> u8 {
        match self {
            AckKind::Ack => ACK_BYTE,
            AckKind::Nack => NACK_BYTE,
        }
    }

    /// Parse a wire value. Returns `None` for anything but 0x06 / 0x15.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK_BYTE => Some(AckKind::Ack),
            NACK_BYTE => Some(AckKind::Nack),
            _ => None,
        }
    }
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckKind::Ack => f.write_str("ACK"),
            AckKind::Nack => f.write_str("NACK"),
        }
    }
}

/// A duplex octet carrier shared by one sender and one receiver.
///
/// The sender writes the data path and reads acknowledgments; the receiver
/// reads the data path and writes acknowledgments. None of the operations
/// block: the `try_*` methods return `Ok(None)` when nothing is available.
pub trait Channel {
    /// Transmit a complete wire frame on the data path.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Take the next byte from the data path, if any.
    fn try_receive_byte(&mut self) -> Result<Option<u8>>;

    /// Post an acknowledgment on the out-of-band path.
    fn send_ack(&mut self, kind: AckKind) -> Result<()>;

    /// Take the pending acknowledgment, if any. Reading consumes it.
    fn try_receive_ack(&mut self) -> Result<Option<AckKind>>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn try_receive_byte(&mut self) -> Result<Option<u8>> {
        (**self).try_receive_byte()
    }

    fn send_ack(&mut self, kind: AckKind) -> Result<()> {
        (**self).send_ack(kind)
    }

    fn try_receive_ack(&mut self) -> Result<Option<AckKind>> {
        (**self).try_receive_ack()
    }
}

/// A restartable deadline.
pub trait Timer {
    /// Start (or restart) the deadline `duration` from now.
    fn arm(&mut self, duration: Duration);

    /// True once an armed deadline has passed. A stopped timer never expires.
    fn expired(&self) -> bool;

    /// Disarm the timer.
    fn stop(&mut self);

    /// Whether the timer is currently armed.
    fn is_armed(&self) -> bool;
}
