use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{FrameError, Result};

/// Start-of-text marker opening every frame.
pub const START_MARKER: u8 = 0x02;

/// End-of-text marker closing every frame.
pub const END_MARKER: u8 = 0x03;

/// Largest payload the 1-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Framing bytes around the payload: start + length + checksum + end.
pub const FRAME_OVERHEAD: usize = 4;

/// Wire size of the largest frame.
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD + FRAME_OVERHEAD;

/// An encoded wire frame.
///
/// Always holds exactly `payload.len() + 4` bytes laid out as
/// `[0x02][LEN][PAYLOAD][CHK][0x03]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    wire: Bytes,
}

impl Frame {
    /// The complete wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.wire
    }

    /// The payload slice inside the frame.
    pub fn payload(&self) -> &[u8] {
        &self.wire[2..self.wire.len() - 2]
    }

    /// The value of the length byte.
    pub fn declared_len(&self) -> u8 {
        self.wire[1]
    }

    /// The value of the checksum byte.
    pub fn checksum(&self) -> u8 {
        self.wire[self.wire.len() - 2]
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.wire.len()
    }

    /// Consume the frame and return its wire bytes.
    pub fn into_bytes(self) -> Bytes {
        self.wire
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.wire
    }
}

/// Encode a payload into a frame no larger than `max_frame_size` bytes.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬─────────────────┬──────────┬──────────┐
/// │ Start    │ Length   │ Payload         │ Checksum │ End      │
/// │ 0x02     │ (1B)     │ (Length bytes)  │ sum % 256│ 0x03     │
/// └──────────┴──────────┴─────────────────┴──────────┴──────────┘
/// ```
///
/// Fails with [`FrameError::InvalidParameter`] for an empty or over-long
/// payload and with [`FrameError::BufferTooSmall`] when the frame would not
/// fit. Nothing is built in either case.
pub fn encode(payload: &[u8], max_frame_size: usize) -> Result<Frame> {
    validate_payload(payload)?;
    let needed = payload.len() + FRAME_OVERHEAD;
    if max_frame_size < needed {
        return Err(FrameError::BufferTooSmall {
            needed,
            available: max_frame_size,
        });
    }

    let mut wire = BytesMut::with_capacity(needed);
    put_frame(payload, &mut wire);
    Ok(Frame {
        wire: wire.freeze(),
    })
}

/// Append the encoded frame for `payload` to `dst`.
pub fn encode_into(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    validate_payload(payload)?;
    dst.reserve(payload.len() + FRAME_OVERHEAD);
    put_frame(payload, dst);
    Ok(())
}

fn validate_payload(payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::InvalidParameter("payload must not be empty"));
    }
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::InvalidParameter(
            "payload exceeds 255 bytes addressable by the length field",
        ));
    }
    Ok(())
}

fn put_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.put_u8(START_MARKER);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    dst.put_u8(checksum(payload));
    dst.put_u8(END_MARKER);
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest frame the writer will emit. Default: [`MAX_FRAME_SIZE`].
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}
