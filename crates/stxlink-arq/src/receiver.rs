use std::collections::VecDeque;

use bytes::Bytes;
use stxlink_frame::{FrameParser, Outcome, ParserState, RejectReason};
use stxlink_transport::{AckKind, Channel};
use tracing::debug;

/// What one receiver step or poll produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// No byte was available.
    Idle,
    /// A byte was consumed, no frame finished.
    Waiting,
    /// A valid frame arrived and was acknowledged.
    Delivered(Bytes),
    /// A corrupt frame arrived and was negatively acknowledged.
    Rejected(RejectReason),
}

/// Default number of delivered payloads kept for [`ReceiverCoordinator::take_delivered`].
pub const DELIVERED_QUEUE_LIMIT: usize = 256;

/// Receiver half of the link.
///
/// Runs indefinitely: bytes go through the parser, a complete frame is
/// answered with ACK, a rejected one with NACK, and parsing restarts.
/// Frame errors never escape; they only show up as NACK or silence.
///
/// Delivered payloads are queued until drained. The queue holds at most
/// `retention` entries; the oldest is evicted when a new one arrives.
#[derive(Debug)]
pub struct ReceiverCoordinator {
    parser: FrameParser,
    last_payload: Option<Bytes>,
    delivered: VecDeque<Bytes>,
    retention: usize,
    frames_delivered: u64,
    frames_rejected: u64,
    payloads_evicted: u64,
}

impl Default for ReceiverCoordinator {
    fn default() -> Self {
        Self::with_retention(DELIVERED_QUEUE_LIMIT)
    }
}

impl ReceiverCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retention` undrained payloads; 0 disables the queue.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            parser: FrameParser::new(),
            last_payload: None,
            delivered: VecDeque::new(),
            retention,
            frames_delivered: 0,
            frames_rejected: 0,
            payloads_evicted: 0,
        }
    }

    /// Consume at most one byte from the channel.
    pub fn step<C: Channel + ?Sized>(&mut self, channel: &mut C) -> crate::Result<ReceiverEvent> {
        let Some(byte) = channel.try_receive_byte()? else {
            return Ok(ReceiverEvent::Idle);
        };

        match self.parser.accept(byte) {
            Outcome::Waiting => Ok(ReceiverEvent::Waiting),
            Outcome::Complete(payload) => {
                channel.send_ack(AckKind::Ack)?;
                self.frames_delivered += 1;
                self.last_payload = Some(payload.clone());
                self.retain(payload.clone());
                debug!(len = payload.len(), "frame delivered, ack sent");
                Ok(ReceiverEvent::Delivered(payload))
            }
            Outcome::Rejected(reason) => {
                channel.send_ack(AckKind::Nack)?;
                self.frames_rejected += 1;
                debug!(%reason, "frame rejected, nack sent");
                Ok(ReceiverEvent::Rejected(reason))
            }
        }
    }

    /// Step until a frame outcome is produced or no byte is available.
    ///
    /// Returns `Idle` when the channel ran dry, whether or not bytes were
    /// consumed on the way.
    pub fn poll<C: Channel + ?Sized>(&mut self, channel: &mut C) -> crate::Result<ReceiverEvent> {
        loop {
            match self.step(channel)? {
                ReceiverEvent::Waiting => continue,
                event => return Ok(event),
            }
        }
    }

    fn retain(&mut self, payload: Bytes) {
        if self.retention == 0 {
            self.payloads_evicted += 1;
            return;
        }
        if self.delivered.len() >= self.retention {
            self.delivered.pop_front();
            self.payloads_evicted += 1;
            debug!(retention = self.retention, "delivered queue full, oldest payload evicted");
        }
        self.delivered.push_back(payload);
    }

    /// Most recently delivered payload.
    pub fn last_payload(&self) -> Option<&Bytes> {
        self.last_payload.as_ref()
    }

    /// Drain every payload delivered since the previous call, oldest first.
    pub fn take_delivered(&mut self) -> Vec<Bytes> {
        self.delivered.drain(..).collect()
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Delivered payloads dropped from, or never entered into, the queue.
    pub fn payloads_evicted(&self) -> u64 {
        self.payloads_evicted
    }

    /// State of the embedded parser.
    pub fn parser_state(&self) -> ParserState {
        self.parser.state()
    }

    /// Borrow the parser for its counters.
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }
}

#[cfg(test)]
mod tests {
    use stxlink_frame::{encode, MAX_FRAME_SIZE};
    use stxlink_transport::MemoryChannel;

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        encode(payload, MAX_FRAME_SIZE).unwrap().as_bytes().to_vec()
    }

    #[test]
    fn idle_on_empty_channel() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        assert_eq!(rx.step(&mut channel).unwrap(), ReceiverEvent::Idle);
        assert_eq!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Idle);
        assert_eq!(rx.parser_state(), ParserState::AwaitingStart);
    }

    #[test]
    fn step_consumes_one_byte() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        channel.inject(&frame(b"ab"));

        assert_eq!(rx.step(&mut channel).unwrap(), ReceiverEvent::Waiting);
        assert_eq!(channel.pending_bytes(), 5);
        assert_eq!(rx.parser_state(), ParserState::AwaitingLength);
    }

    #[test]
    fn poll_delivers_and_acks() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        channel.inject(&frame(b"hello"));

        let event = rx.poll(&mut channel).unwrap();
        assert_eq!(event, ReceiverEvent::Delivered(Bytes::from_static(b"hello")));
        assert_eq!(channel.try_receive_ack().unwrap(), Some(AckKind::Ack));
        assert_eq!(rx.last_payload().unwrap().as_ref(), b"hello");
        assert_eq!(rx.frames_delivered(), 1);
    }

    #[test]
    fn poll_stops_after_one_frame() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        channel.inject(&frame(b"a"));
        channel.inject(&frame(b"b"));

        assert!(matches!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Delivered(_)));
        assert_eq!(channel.pending_bytes(), 5);
        assert!(matches!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Delivered(_)));
        assert_eq!(rx.take_delivered(), vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert!(rx.take_delivered().is_empty());
        assert_eq!(rx.last_payload().unwrap().as_ref(), b"b");
    }

    #[test]
    fn corrupt_frame_is_nacked() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        let mut bytes = frame(b"abc");
        bytes[2] ^= 0x01;
        channel.inject(&bytes);

        assert!(matches!(
            rx.poll(&mut channel).unwrap(),
            ReceiverEvent::Rejected(RejectReason::ChecksumMismatch { .. })
        ));
        assert_eq!(channel.try_receive_ack().unwrap(), Some(AckKind::Nack));
        assert_eq!(rx.frames_rejected(), 1);
        assert!(rx.last_payload().is_none());
    }

    #[test]
    fn bad_terminator_is_nacked() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        let mut bytes = frame(b"abc");
        let end = bytes.len() - 1;
        bytes[end] = 0x7F;
        channel.inject(&bytes);

        assert_eq!(
            rx.poll(&mut channel).unwrap(),
            ReceiverEvent::Rejected(RejectReason::BadTerminator { found: 0x7F })
        );
        assert_eq!(channel.try_receive_ack().unwrap(), Some(AckKind::Nack));
    }

    #[test]
    fn zero_length_frame_gets_no_ack() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        channel.inject(&[0x02, 0x00]);

        assert_eq!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Idle);
        assert!(!channel.has_pending_ack());
        assert_eq!(rx.parser_state(), ParserState::AwaitingStart);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        let bytes = frame(b"split");
        channel.inject(&bytes[..4]);

        assert_eq!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Idle);
        assert_eq!(rx.parser_state(), ParserState::AwaitingPayload);

        channel.inject(&bytes[4..]);
        assert_eq!(
            rx.poll(&mut channel).unwrap(),
            ReceiverEvent::Delivered(Bytes::from_static(b"split"))
        );
    }

    #[test]
    fn noise_before_frame_is_skipped() {
        let mut rx = ReceiverCoordinator::new();
        let mut channel = MemoryChannel::new();
        channel.inject(&[0xFF, 0x03, 0x41]);
        channel.inject(&frame(b"ok"));

        assert!(matches!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Delivered(_)));
        assert_eq!(rx.parser().bytes_discarded(), 3);
        assert_eq!(rx.frames_rejected(), 0);
    }

    #[test]
    fn delivered_queue_evicts_oldest_when_full() {
        let mut rx = ReceiverCoordinator::with_retention(2);
        let mut channel = MemoryChannel::new();
        for payload in [&b"a"[..], &b"b"[..], &b"c"[..]] {
            channel.inject(&frame(payload));
            assert!(matches!(rx.poll(&mut channel).unwrap(), ReceiverEvent::Delivered(_)));
            channel.try_receive_ack().unwrap();
        }

        assert_eq!(rx.frames_delivered(), 3);
        assert_eq!(rx.payloads_evicted(), 1);
        assert_eq!(rx.last_payload(), Some(&Bytes::from_static(b"c")));
        assert_eq!(
            rx.take_delivered(),
            vec![Bytes::from_static(b"b"), Bytes::from_static(b"c")]
        );
    }

    #[test]
    fn zero_retention_keeps_nothing() {
        let mut rx = ReceiverCoordinator::with_retention(0);
        let mut channel = MemoryChannel::new();
        channel.inject(&frame(b"gone"));

        assert_eq!(
            rx.poll(&mut channel).unwrap(),
            ReceiverEvent::Delivered(Bytes::from_static(b"gone"))
        );
        assert_eq!(channel.try_receive_ack().unwrap(), Some(AckKind::Ack));
        assert!(rx.take_delivered().is_empty());
        assert_eq!(rx.payloads_evicted(), 1);
    }
}
