use std::fmt;

use stxlink_frame::{encode, Frame, FrameError};
use stxlink_transport::{AckKind, Channel, Timer};
use tracing::{debug, info, warn};

use crate::config::ArqConfig;
use crate::error::{ArqError, Result};

/// Lifecycle of one outbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// No payload submitted, or the last result was taken.
    Idle,
    /// Frame built, not yet on the channel.
    Transmitting,
    /// Frame sent, timer armed.
    AwaitingAck,
    /// Positive acknowledgment received.
    Succeeded,
    /// Gave up; see [`SendFailure`].
    Failed,
}

impl SenderState {
    /// `Succeeded` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SenderState::Succeeded | SenderState::Failed)
    }

    /// `Transmitting` or `AwaitingAck`.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SenderState::Transmitting | SenderState::AwaitingAck)
    }
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SenderState::Idle => "idle",
            SenderState::Transmitting => "transmitting",
            SenderState::AwaitingAck => "awaiting-ack",
            SenderState::Succeeded => "succeeded",
            SenderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a send attempt ended in [`SenderState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// No positive acknowledgment before the retry budget ran out.
    Timeout { attempts: u32 },
    /// The payload could not be framed.
    InvalidParameter(&'static str),
    /// The frame exceeds the configured maximum frame size.
    BufferTooSmall { needed: usize, available: usize },
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::Timeout { attempts } => {
                write!(f, "timed out after {attempts} transmissions")
            }
            SendFailure::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            SendFailure::BufferTooSmall { needed, available } => write!(
                f,
                "frame needs {needed} bytes, maximum frame size is {available}"
            ),
        }
    }
}

/// Terminal result of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Succeeded,
    Failed(SendFailure),
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Succeeded)
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Succeeded => f.write_str("succeeded"),
            SendOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Stop-and-wait sender for one payload at a time.
///
/// Drive it with [`step`](Self::step); each call does at most one unit of
/// work and never blocks. The sender owns its timer and reaches the channel
/// only through the arguments it is given.
#[derive(Debug)]
pub struct SenderCoordinator<T> {
    config: ArqConfig,
    timer: T,
    state: SenderState,
    frame: Option<Frame>,
    retries: u8,
    transmissions: u32,
    outcome: Option<SendOutcome>,
}

impl<T: Timer> SenderCoordinator<T> {
    /// Create a sender with default configuration.
    pub fn new(timer: T) -> Self {
        Self::with_config(timer, ArqConfig::default())
    }

    /// Create a sender with explicit configuration.
    pub fn with_config(timer: T, config: ArqConfig) -> Self {
        Self {
            config,
            timer,
            state: SenderState::Idle,
            frame: None,
            retries: 0,
            transmissions: 0,
            outcome: None,
        }
    }

    /// Start a new attempt for `payload`.
    ///
    /// Fails with [`ArqError::Busy`] while a previous payload is in flight and
    /// with [`ArqError::InvalidParameter`] for an empty payload; neither
    /// touches the current attempt. A payload the encoder refuses moves the
    /// sender straight to [`SenderState::Failed`].
    pub fn submit(&mut self, payload: &[u8]) -> Result<SenderState> {
        if self.state.is_in_flight() {
            return Err(ArqError::Busy);
        }
        if payload.is_empty() {
            return Err(ArqError::InvalidParameter("payload must not be empty"));
        }

        self.timer.stop();
        self.retries = 0;
        self.transmissions = 0;
        self.outcome = None;
        self.frame = None;

        debug!(len = payload.len(), "building frame");
        match encode(payload, self.config.max_frame_size) {
            Ok(frame) => {
                self.frame = Some(frame);
                self.state = SenderState::Transmitting;
            }
            Err(FrameError::InvalidParameter(msg)) => {
                self.fail(SendFailure::InvalidParameter(msg));
            }
            Err(FrameError::BufferTooSmall { needed, available }) => {
                self.fail(SendFailure::BufferTooSmall { needed, available });
            }
            Err(err) => return Err(err.into()),
        }
        Ok(self.state)
    }

    /// Make one unit of progress.
    ///
    /// In `AwaitingAck` the acknowledgment is checked before the timer, so an
    /// ACK that arrives in the same turn as the deadline still succeeds.
    pub fn step<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<SenderState> {
        match self.state {
            SenderState::Transmitting => {
                while let Some(stale) = channel.try_receive_ack()? {
                    debug!(kind = %stale, "discarding stale acknowledgment");
                }
                self.transmit(channel)?;
                self.state = SenderState::AwaitingAck;
            }
            SenderState::AwaitingAck => match channel.try_receive_ack()? {
                Some(AckKind::Ack) => {
                    self.timer.stop();
                    self.state = SenderState::Succeeded;
                    self.outcome = Some(SendOutcome::Succeeded);
                    info!(
                        retries = self.retries,
                        transmissions = self.transmissions,
                        "payload acknowledged"
                    );
                }
                Some(AckKind::Nack) => self.retry(channel, "nack")?,
                None if self.timer.expired() => self.retry(channel, "timeout")?,
                None => {}
            },
            SenderState::Idle | SenderState::Succeeded | SenderState::Failed => {}
        }
        Ok(self.state)
    }

    /// Abandon the current attempt and return to `Idle`.
    pub fn cancel(&mut self) {
        if self.state.is_in_flight() {
            debug!(state = %self.state, "send attempt cancelled");
        }
        self.timer.stop();
        self.reset();
    }

    /// Current state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Failed attempts (NACK or timeout) counted so far.
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Times the frame was handed to the channel.
    pub fn transmissions(&self) -> u32 {
        self.transmissions
    }

    /// Terminal result, once reached.
    pub fn result(&self) -> Option<&SendOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the attempt reached `Succeeded` or `Failed`.
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Observe completion: returns the terminal result and discards the
    /// attempt record, leaving the sender `Idle`. `None` while not complete.
    pub fn take_result(&mut self) -> Option<SendOutcome> {
        if !self.is_complete() {
            return None;
        }
        let outcome = self.outcome.take();
        self.reset();
        outcome
    }

    /// The frame of the current attempt.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    fn transmit<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<()> {
        if let Some(frame) = &self.frame {
            channel.send(frame.as_bytes())?;
            self.transmissions += 1;
            self.timer.arm(self.config.ack_timeout);
        }
        Ok(())
    }

    fn retry<C: Channel + ?Sized>(&mut self, channel: &mut C, reason: &'static str) -> Result<()> {
        self.retries = self.retries.saturating_add(1);
        if self.retries >= self.config.max_retries {
            self.timer.stop();
            self.fail(SendFailure::Timeout {
                attempts: self.transmissions,
            });
            return Ok(());
        }
        debug!(retries = self.retries, reason, "retransmitting frame");
        self.transmit(channel)
    }

    fn fail(&mut self, failure: SendFailure) {
        warn!(%failure, retries = self.retries, "send failed");
        self.state = SenderState::Failed;
        self.outcome = Some(SendOutcome::Failed(failure));
    }

    fn reset(&mut self) {
        self.state = SenderState::Idle;
        self.frame = None;
        self.retries = 0;
        self.transmissions = 0;
        self.outcome = None;
    }
}
