//! Single-threaded cooperative driver for one sender and one receiver.

use std::time::Duration;

use bytes::Bytes;
use stxlink_transport::{Channel, DeadlineTimer, LogicalClock};
use tracing::{debug, warn};

use crate::config::{ArqConfig, LinkConfig};
use crate::error::{ArqError, Result};
use crate::receiver::{ReceiverCoordinator, ReceiverEvent};
use crate::sender::{SendOutcome, SenderCoordinator, SenderState};

/// Summary of one [`Link::transfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub outcome: SendOutcome,
    pub retries: u8,
    pub transmissions: u32,
    pub turns: u64,
    /// Logical time spent.
    pub elapsed: Duration,
    /// Payloads the receiver delivered during the transfer, duplicates included.
    pub delivered: Vec<Bytes>,
}

/// Owns a channel, a logical clock, a sender and a receiver, and alternates
/// between them: each turn is one sender step followed by one receiver poll.
#[derive(Debug)]
pub struct Link<C> {
    channel: C,
    clock: LogicalClock,
    sender: SenderCoordinator<DeadlineTimer>,
    receiver: ReceiverCoordinator,
    config: LinkConfig,
}

impl<C: Channel> Link<C> {
    /// Create a link with default configuration.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, ArqConfig::default(), LinkConfig::default())
    }

    /// Create a link with explicit configuration.
    pub fn with_config(channel: C, arq: ArqConfig, config: LinkConfig) -> Self {
        let clock = LogicalClock::new();
        let sender = SenderCoordinator::with_config(clock.timer(), arq);
        Self {
            channel,
            clock,
            sender,
            receiver: ReceiverCoordinator::new(),
            config,
        }
    }

    /// One scheduling turn: sender step, then receiver poll.
    pub fn turn(&mut self) -> Result<(SenderState, ReceiverEvent)> {
        let state = self.sender.step(&mut self.channel)?;
        let event = self.receiver.poll(&mut self.channel)?;
        Ok((state, event))
    }

    /// Submit `payload` and run turns until the sender finishes.
    ///
    /// The clock advances by [`LinkConfig::tick`] after every turn. When
    /// [`LinkConfig::max_turns`] runs out the attempt is cancelled and
    /// [`ArqError::TurnLimit`] is returned. A channel error also cancels the
    /// attempt before it is returned, so the link accepts the next transfer.
    pub fn transfer(&mut self, payload: &[u8]) -> Result<TransferReport> {
        self.sender.submit(payload)?;
        let stale = self.receiver.take_delivered();
        if !stale.is_empty() {
            debug!(count = stale.len(), "discarded payloads from abandoned transfer");
        }
        let started = self.clock.now();
        let mut turns = 0u64;

        let outcome = loop {
            if let Some(outcome) = self.sender.result() {
                break outcome.clone();
            }
            if turns >= self.config.max_turns {
                warn!(turns, "transfer exceeded turn limit");
                self.sender.cancel();
                return Err(ArqError::TurnLimit { turns });
            }
            if let Err(err) = self.turn() {
                warn!(error = %err, turns, "transfer aborted by channel error");
                self.sender.cancel();
                return Err(err);
            }
            turns += 1;
            self.clock.advance(self.config.tick);
        };

        let retries = self.sender.retries();
        let transmissions = self.sender.transmissions();
        self.sender.take_result();
        let report = TransferReport {
            outcome,
            retries,
            transmissions,
            turns,
            elapsed: self.clock.now().saturating_sub(started),
            delivered: self.receiver.take_delivered(),
        };
        debug!(
            outcome = %report.outcome,
            retries,
            transmissions,
            turns,
            "transfer finished"
        );
        Ok(report)
    }

    /// The shared logical clock.
    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutable channel access, for loss injection between transfers.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn sender(&self) -> &SenderCoordinator<DeadlineTimer> {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut SenderCoordinator<DeadlineTimer> {
        &mut self.sender
    }

    pub fn receiver(&self) -> &ReceiverCoordinator {
        &self.receiver
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Consume the link and return its channel.
    pub fn into_channel(self) -> C {
        self.channel
    }
}
