use std::fmt;
use std::io;

use stxlink_arq::{ArqError, SendFailure, SendOutcome};
use stxlink_frame::FrameError;

// Exit codes follow the sysexits / timeout(1) conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidParameter(_) | FrameError::BufferTooSmall { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::ChecksumOrFraming(_) | FrameError::ConnectionClosed => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn arq_error(context: &str, err: ArqError) -> CliError {
    match err {
        ArqError::Frame(err) => frame_error(context, err),
        ArqError::InvalidParameter(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ArqError::TurnLimit { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ArqError::Busy => CliError::new(FAILURE, format!("{context}: {err}")),
        ArqError::Transport(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Exit code for a finished transfer.
pub fn outcome_code(outcome: &SendOutcome) -> i32 {
    match outcome {
        SendOutcome::Succeeded => SUCCESS,
        SendOutcome::Failed(SendFailure::Timeout { .. }) => TIMEOUT,
        SendOutcome::Failed(SendFailure::InvalidParameter(_))
        | SendOutcome::Failed(SendFailure::BufferTooSmall { .. }) => DATA_INVALID,
    }
}
