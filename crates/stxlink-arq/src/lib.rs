//! Stop-and-wait ARQ over stxlink frames.
//!
//! A [`SenderCoordinator`] and a [`ReceiverCoordinator`] never see each
//! other. They share only a [`stxlink_transport::Channel`]; the sender also
//! owns a [`stxlink_transport::Timer`]. Both are driven by non-blocking
//! `step` calls, either from the cooperative [`Link`] scheduler or from
//! separate threads over a [`stxlink_transport::SharedChannel`].

pub mod config;
pub mod error;
pub mod link;
pub mod receiver;
pub mod sender;

pub use config::{ArqConfig, LinkConfig, ACK_TIMEOUT, MAX_RETRIES};
pub use error::{ArqError, Result};
pub use link::{Link, TransferReport};
pub use receiver::{ReceiverCoordinator, ReceiverEvent, DELIVERED_QUEUE_LIMIT};
pub use sender::{SendFailure, SendOutcome, SenderCoordinator, SenderState};
