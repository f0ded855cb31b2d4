/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A shared channel's lock was poisoned by a panicking holder.
    #[error("channel lock poisoned during {op}")]
    Poisoned { op: &'static str },
}

pub type Result<T> = std::result::Result<T, TransportError>;
