use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::error::Result;
use crate::traits::{AckKind, Channel};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// When a channel path silently drops what it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossPolicy {
    /// Deliver everything.
    #[default]
    Never,
    /// Drop everything.
    Always,
    /// Drop the first `n` items after the policy is installed, then deliver.
    First(u32),
}

impl LossPolicy {
    fn drops(self, seen: u32) -> bool {
        match self {
            LossPolicy::Never => false,
            LossPolicy::Always => true,
            LossPolicy::First(n) => seen < n,
        }
    }
}

/// Loss configuration for a [`MemoryChannel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelConfig {
    /// Applied to each `send` on the data path.
    pub data_loss: LossPolicy,
    /// Applied to each `send_ack` on the acknowledgment path.
    pub ack_loss: LossPolicy,
}

/// Counters kept by a [`MemoryChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Calls to `send`, delivered or not.
    pub transmissions: u64,
    /// Transmissions swallowed by the loss policy.
    pub transmissions_dropped: u64,
    /// Bytes handed to the receiver.
    pub bytes_received: u64,
    /// Calls to `send_ack`, delivered or not.
    pub acks_sent: u64,
    /// Acknowledgments swallowed by the loss policy.
    pub acks_dropped: u64,
}

/// In-process channel used by tests, the simulator and the CLI.
///
/// The data path is a FIFO byte queue. The acknowledgment path is a single
/// slot: a newer acknowledgment replaces an unread one, and reading clears it.
#[derive(Debug)]
pub struct MemoryChannel {
    config: ChannelConfig,
    data: BytesMut,
    ack: Option<AckKind>,
    data_seen: u32,
    ack_seen: u32,
    corrupt_next: Option<(usize, u8)>,
    stats: ChannelStats,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    /// Create a lossless channel.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Create a channel with explicit loss configuration.
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            config,
            data: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            ack: None,
            data_seen: 0,
            ack_seen: 0,
            corrupt_next: None,
            stats: ChannelStats::default(),
        }
    }

    /// Replace the data-path loss policy. `First(n)` counts from this call.
    pub fn set_data_loss(&mut self, policy: LossPolicy) {
        self.config.data_loss = policy;
        self.data_seen = 0;
    }

    /// Replace the acknowledgment-path loss policy. `First(n)` counts from this call.
    pub fn set_ack_loss(&mut self, policy: LossPolicy) {
        self.config.ack_loss = policy;
        self.ack_seen = 0;
    }

    /// XOR `mask` into the byte at `offset` of the next delivered transmission.
    ///
    /// Offsets past the end of that transmission leave it untouched.
    pub fn corrupt_next(&mut self, offset: usize, mask: u8) {
        self.corrupt_next = Some((offset, mask));
    }

    /// Push raw bytes onto the data path, bypassing loss and corruption.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Bytes waiting on the data path.
    pub fn pending_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether an unread acknowledgment is waiting.
    pub fn has_pending_ack(&self) -> bool {
        self.ack.is_some()
    }

    /// Current loss configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Traffic counters.
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Drop all queued bytes and any pending acknowledgment.
    pub fn clear(&mut self) {
        self.data.clear();
        self.ack = None;
        self.corrupt_next = None;
    }
}

impl Channel for MemoryChannel {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stats.transmissions += 1;
        let dropped = self.config.data_loss.drops(self.data_seen);
        self.data_seen = self.data_seen.saturating_add(1);

        if dropped {
            self.stats.transmissions_dropped += 1;
            debug!(len = bytes.len(), "channel dropped transmission");
            return Ok(());
        }

        let start = self.data.len();
        self.data.extend_from_slice(bytes);
        if let Some((offset, mask)) = self.corrupt_next.take() {
            if offset < bytes.len() {
                self.data[start + offset] ^= mask;
                debug!(offset, mask, "channel corrupted transmission");
            }
        }
        Ok(())
    }

    fn try_receive_byte(&mut self) -> Result<Option<u8>> {
        if !self.data.has_remaining() {
            return Ok(None);
        }
        self.stats.bytes_received += 1;
        Ok(Some(self.data.get_u8()))
    }

    fn send_ack(&mut self, kind: AckKind) -> Result<()> {
        self.stats.acks_sent += 1;
        let dropped = self.config.ack_loss.drops(self.ack_seen);
        self.ack_seen = self.ack_seen.saturating_add(1);

        if dropped {
            self.stats.acks_dropped += 1;
            debug!(%kind, "channel dropped acknowledgment");
            return Ok(());
        }
        self.ack = Some(kind);
        Ok(())
    }

    fn try_receive_ack(&mut self) -> Result<Option<AckKind>> {
        Ok(self.ack.take())
    }
}
