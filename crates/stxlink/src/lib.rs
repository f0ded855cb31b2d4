//! Byte-oriented framing with stop-and-wait retransmission.
//!
//! stxlink wraps payloads of 1 to 255 bytes in `0x02 LEN PAYLOAD CHK 0x03`
//! frames, parses them back one byte at a time with silent
//! resynchronization, and retries unacknowledged frames under a timeout.
//!
//! # Crate Structure
//!
//! - [`transport`]: Channel and timer abstractions, in-memory lossy channel
//! - [`frame`]: Checksum, frame codec, byte-at-a-time parser, stream adapters
//! - [`arq`]: Sender and receiver coordinators and the link scheduler (behind `arq` feature)

/// Re-export transport types.
pub mod transport {
    pub use stxlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use stxlink_frame::*;
}

/// Re-export ARQ types (requires `arq` feature).
#[cfg(feature = "arq")]
pub mod arq {
    pub use stxlink_arq::*;
}
