//! Channel and timer abstractions for the stxlink framing protocol.
//!
//! The sender and receiver coordinators never touch each other directly.
//! Everything they share goes through two collaborators defined here:
//! - [`Channel`]: a duplex byte carrier with an out-of-band ACK/NACK path
//! - [`Timer`]: a deadline that is either armed or expired
//!
//! This is the lowest layer of stxlink. It also ships the in-memory
//! [`MemoryChannel`] with loss injection and the [`LogicalClock`] used to
//! drive timers deterministically.

pub mod clock;
pub mod error;
pub mod memory;
pub mod shared;
pub mod traits;

pub use clock::{DeadlineTimer, LogicalClock, MonotonicTimer};
pub use error::{Result, TransportError};
pub use memory::{ChannelConfig, ChannelStats, LossPolicy, MemoryChannel};
pub use shared::SharedChannel;
pub use traits::{AckKind, Channel, Timer, ACK_BYTE, NACK_BYTE};
