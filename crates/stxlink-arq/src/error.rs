/// Errors that can occur in ARQ operations.
#[derive(Debug, thiserror::Error)]
pub enum ArqError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] stxlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] stxlink_frame::FrameError),

    /// A payload was submitted while the previous one is still in flight.
    #[error("sender busy: previous payload still awaiting acknowledgment")]
    Busy,

    /// The caller passed an unusable argument.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The link scheduler ran out of turns before the sender finished.
    #[error("transfer did not complete within {turns} turns")]
    TurnLimit { turns: u64 },
}

pub type Result<T> = std::result::Result<T, ArqError>;
