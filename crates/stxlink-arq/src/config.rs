use std::time::Duration;

use stxlink_frame::MAX_FRAME_SIZE;

/// Attempts before the sender gives up.
pub const MAX_RETRIES: u8 = 3;

/// How long the sender waits for an acknowledgment per attempt.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct ArqConfig {
    /// Failed attempts (NACK or timeout) tolerated before `Failed(Timeout)`.
    /// Default: [`MAX_RETRIES`].
    pub max_retries: u8,
    /// Acknowledgment window armed after every transmission.
    /// Default: [`ACK_TIMEOUT`].
    pub ack_timeout: Duration,
    /// Upper bound handed to the frame encoder.
    /// Default: [`MAX_FRAME_SIZE`].
    pub max_frame_size: usize,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            ack_timeout: ACK_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Cooperative scheduler configuration for [`crate::Link`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Logical time added after each turn.
    pub tick: Duration,
    /// Turns allowed before `transfer` gives up with `TurnLimit`.
    pub max_turns: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            max_turns: 10_000,
        }
    }
}
