use crate::parser::RejectReason;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Empty payload, or a payload the length byte cannot describe.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The destination cannot hold the encoded frame.
    #[error("buffer too small ({needed} bytes needed, {available} available)")]
    BufferTooSmall { needed: usize, available: usize },

    /// Wire-level corruption: bad terminator or checksum mismatch.
    #[error("checksum or framing error: {0}")]
    ChecksumOrFraming(RejectReason),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
