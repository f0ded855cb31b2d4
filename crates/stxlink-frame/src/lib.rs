//! STX/ETX message framing with an additive checksum.
//!
//! Every payload (1..=255 bytes) travels as:
//! - a start marker `0x02`
//! - a 1-byte payload length
//! - the payload
//! - a 1-byte wrapping sum of the payload
//! - an end marker `0x03`
//!
//! Encoding is a pure function ([`encode`]). Decoding is stream-driven: the
//! [`FrameParser`] takes one byte at a time and silently resynchronizes on
//! noise, truncation and corruption.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod parser;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::StxCodec;
pub use checksum::{checksum, Checksum};
pub use codec::{
    encode, encode_into, Frame, FrameConfig, END_MARKER, FRAME_OVERHEAD, MAX_FRAME_SIZE,
    MAX_PAYLOAD, START_MARKER,
};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, Outcome, ParserState, RejectReason};
pub use reader::FrameReader;
pub use writer::FrameWriter;
