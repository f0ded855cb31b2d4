//! Byte-at-a-time frame parser.
//!
//! The parser is a five-state machine. Each call to [`FrameParser::accept`]
//! consumes exactly one byte and yields one [`Outcome`]. There is no
//! read-ahead and no error that stops the stream: anything unexpected drops
//! the frame in progress and the parser falls back to
//! [`ParserState::AwaitingStart`], where every byte other than the start
//! marker is discarded until a new frame begins.
//!
//! ```text
//!            0x02                 LEN > 0              LEN bytes
//! AwaitingStart ──▶ AwaitingLength ──▶ AwaitingPayload ──▶ AwaitingChecksum
//!      ▲  ▲              │ LEN == 0                               │ CHK
//!      │  └──────────────┘                                        ▼
//!      └──────────── Complete / Rejected ◀──────────────────── AwaitingEnd
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::checksum::Checksum;
use crate::codec::{END_MARKER, MAX_PAYLOAD, START_MARKER};

/// Where the parser is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Idle; discarding bytes until a start marker.
    AwaitingStart,
    /// Start marker seen; next byte is the payload length.
    AwaitingLength,
    /// Collecting payload bytes.
    AwaitingPayload,
    /// Payload complete; next byte is the checksum.
    AwaitingChecksum,
    /// Checksum recorded; next byte must be the end marker.
    AwaitingEnd,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::AwaitingStart => "awaiting-start",
            ParserState::AwaitingLength => "awaiting-length",
            ParserState::AwaitingPayload => "awaiting-payload",
            ParserState::AwaitingChecksum => "awaiting-checksum",
            ParserState::AwaitingEnd => "awaiting-end",
        };
        f.write_str(name)
    }
}

/// Why a fully delimited frame was thrown away.
///
/// Both variants are the same error class on the wire (a checksum or framing
/// error); the split only exists for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The byte after the checksum was not the end marker.
    BadTerminator { found: u8 },
    /// The end marker was present but the sums disagree.
    ChecksumMismatch { computed: u8, received: u8 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BadTerminator { found } => {
                write!(f, "expected end marker 0x03, found 0x{found:02X}")
            }
            RejectReason::ChecksumMismatch { computed, received } => write!(
                f,
                "checksum mismatch (computed 0x{computed:02X}, received 0x{received:02X})"
            ),
        }
    }
}

/// Result of feeding one byte to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// More bytes are needed.
    Waiting,
    /// A valid frame ended on this byte; carries its payload.
    Complete(Bytes),
    /// A frame ended on this byte but failed validation.
    Rejected(RejectReason),
}

impl Outcome {
    /// True for anything but [`Outcome::Waiting`].
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Waiting)
    }
}

/// Incremental receive-side state machine.
///
/// Owns the in-flight receive buffer exclusively; it is cleared whenever the
/// parser returns to [`ParserState::AwaitingStart`].
#[derive(Debug)]
pub struct FrameParser {
    state: ParserState,
    buf: BytesMut,
    expected_len: u8,
    running: Checksum,
    received_checksum: u8,
    frames_completed: u64,
    frames_rejected: u64,
    bytes_discarded: u64,
    zero_length_drops: u64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingStart,
            buf: BytesMut::with_capacity(MAX_PAYLOAD),
            expected_len: 0,
            running: Checksum::new(),
            received_checksum: 0,
            frames_completed: 0,
            frames_rejected: 0,
            bytes_discarded: 0,
            zero_length_drops: 0,
        }
    }

    /// Consume exactly one byte.
    pub fn accept(&mut self, byte: u8) -> Outcome {
        let from = self.state;
        let outcome = match self.state {
            ParserState::AwaitingStart => {
                if byte == START_MARKER {
                    self.clear_frame();
                    self.state = ParserState::AwaitingLength;
                } else {
                    self.bytes_discarded += 1;
                }
                Outcome::Waiting
            }
            ParserState::AwaitingLength => {
                if byte == 0 {
                    debug!("zero-length frame dropped, resynchronizing");
                    self.zero_length_drops += 1;
                    self.return_to_start();
                } else {
                    self.expected_len = byte;
                    self.state = ParserState::AwaitingPayload;
                }
                Outcome::Waiting
            }
            ParserState::AwaitingPayload => {
                self.buf.put_u8(byte);
                self.running = self.running.update(byte);
                if self.buf.len() >= usize::from(self.expected_len) {
                    self.state = ParserState::AwaitingChecksum;
                }
                Outcome::Waiting
            }
            ParserState::AwaitingChecksum => {
                self.received_checksum = byte;
                self.state = ParserState::AwaitingEnd;
                Outcome::Waiting
            }
            ParserState::AwaitingEnd => {
                let computed = self.running.value();
                let outcome = if byte != END_MARKER {
                    Outcome::Rejected(RejectReason::BadTerminator { found: byte })
                } else if computed != self.received_checksum {
                    Outcome::Rejected(RejectReason::ChecksumMismatch {
                        computed,
                        received: self.received_checksum,
                    })
                } else {
                    Outcome::Complete(Bytes::copy_from_slice(&self.buf))
                };

                match &outcome {
                    Outcome::Complete(payload) => {
                        self.frames_completed += 1;
                        debug!(len = payload.len(), "frame complete");
                    }
                    Outcome::Rejected(reason) => {
                        self.frames_rejected += 1;
                        debug!(%reason, "frame rejected, resynchronizing");
                    }
                    Outcome::Waiting => {}
                }
                self.return_to_start();
                outcome
            }
        };

        if from != self.state {
            trace!(byte, %from, to = %self.state, "parser transition");
        }
        outcome
    }

    /// Feed a slice and collect every non-waiting outcome, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Outcome> {
        bytes
            .iter()
            .map(|&b| self.accept(b))
            .filter(Outcome::is_final)
            .collect()
    }

    /// Drop any frame in progress and wait for a new start marker.
    pub fn reset(&mut self) {
        self.return_to_start();
    }

    /// Current state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True when no frame is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == ParserState::AwaitingStart
    }

    /// Payload bytes collected for the frame in progress.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Payload length announced by the frame in progress (0 when idle).
    pub fn expected_len(&self) -> u8 {
        self.expected_len
    }

    /// Frames that validated.
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Frames that failed checksum or terminator validation.
    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Bytes thrown away while waiting for a start marker.
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }

    /// Frames dropped because their length byte was zero.
    pub fn zero_length_drops(&self) -> u64 {
        self.zero_length_drops
    }

    fn return_to_start(&mut self) {
        self.clear_frame();
        self.state = ParserState::AwaitingStart;
    }

    fn clear_frame(&mut self) {
        self.buf.clear();
        self.expected_len = 0;
        self.running = Checksum::new();
        self.received_checksum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, MAX_FRAME_SIZE};

    fn completes(outcomes: &[Outcome]) -> Vec<Bytes> {
        outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::Complete(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    fn rejects(outcomes: &[Outcome]) -> usize {
        outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Rejected(_)))
            .count()
    }

    #[test]
    fn initial_state_is_awaiting_start() {
        let parser = FrameParser::new();
        assert_eq!(parser.state(), ParserState::AwaitingStart);
        assert!(parser.is_idle());
        assert!(parser.buffered().is_empty());
    }

    #[test]
    fn receives_valid_message() {
        let mut parser = FrameParser::new();
        for byte in [START_MARKER, 2, 0x10, 0x20, 0x30] {
            assert_eq!(parser.accept(byte), Outcome::Waiting);
        }
        let outcome = parser.accept(END_MARKER);
        assert_eq!(
            outcome,
            Outcome::Complete(Bytes::from_static(&[0x10, 0x20]))
        );
        assert_eq!(parser.frames_completed(), 1);
    }

    #[test]
    fn walks_every_state() {
        let mut parser = FrameParser::new();
        parser.accept(START_MARKER);
        assert_eq!(parser.state(), ParserState::AwaitingLength);
        parser.accept(1);
        assert_eq!(parser.state(), ParserState::AwaitingPayload);
        assert_eq!(parser.expected_len(), 1);
        parser.accept(0x42);
        assert_eq!(parser.state(), ParserState::AwaitingChecksum);
        parser.accept(0x42);
        assert_eq!(parser.state(), ParserState::AwaitingEnd);
        let outcome = parser.accept(END_MARKER);
        assert!(matches!(outcome, Outcome::Complete(_)));
        assert_eq!(parser.state(), ParserState::AwaitingStart);
    }

    #[test]
    fn stays_in_payload_until_full() {
        let mut parser = FrameParser::new();
        parser.feed(&[START_MARKER, 3, 0xAA, 0xBB]);
        assert_eq!(parser.state(), ParserState::AwaitingPayload);
        assert_eq!(parser.buffered(), &[0xAA, 0xBB]);
        parser.accept(0xCC);
        assert_eq!(parser.state(), ParserState::AwaitingChecksum);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut parser = FrameParser::new();
        let outcomes = parser.feed(&[START_MARKER, 2, 0x10, 0x20, 0xFF, END_MARKER]);
        assert_eq!(
            outcomes,
            vec![Outcome::Rejected(RejectReason::ChecksumMismatch {
                computed: 0x30,
                received: 0xFF
            })]
        );
        assert!(parser.is_idle());
        assert_eq!(parser.frames_rejected(), 1);
    }

    #[test]
    fn rejects_bad_terminator() {
        let mut parser = FrameParser::new();
        let outcomes = parser.feed(&[START_MARKER, 1, 0x42, 0x42, 0x04]);
        assert_eq!(
            outcomes,
            vec![Outcome::Rejected(RejectReason::BadTerminator { found: 0x04 })]
        );
        assert!(parser.is_idle());
    }

    #[test]
    fn ignores_noise_before_start() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.accept(0xFF), Outcome::Waiting);
        assert_eq!(parser.accept(0x00), Outcome::Waiting);
        assert_eq!(parser.state(), ParserState::AwaitingStart);
        assert_eq!(parser.bytes_discarded(), 2);

        parser.accept(START_MARKER);
        assert_eq!(parser.state(), ParserState::AwaitingLength);
    }

    #[test]
    fn zero_length_is_dropped_silently() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.accept(START_MARKER), Outcome::Waiting);
        assert_eq!(parser.accept(0), Outcome::Waiting);
        assert!(parser.is_idle());
        assert_eq!(parser.zero_length_drops(), 1);
        assert_eq!(parser.frames_rejected(), 0);

        let frame = encode(b"ok", MAX_FRAME_SIZE).unwrap();
        let outcomes = parser.feed(frame.as_bytes());
        assert_eq!(outcomes, vec![Outcome::Complete(Bytes::from_static(b"ok"))]);
    }

    #[test]
    fn resets_after_message() {
        let mut parser = FrameParser::new();
        let outcomes = parser.feed(&[START_MARKER, 1, 0x42, 0x42, END_MARKER]);
        assert_eq!(outcomes.len(), 1);
        assert!(parser.is_idle());
        assert!(parser.buffered().is_empty());
        assert_eq!(parser.expected_len(), 0);
    }

    #[test]
    fn roundtrip_every_length() {
        let mut parser = FrameParser::new();
        for len in 1..=MAX_PAYLOAD {
            let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31)).collect();
            let frame = encode(&payload, MAX_FRAME_SIZE).unwrap();

            let bytes = frame.as_bytes();
            for &b in &bytes[..bytes.len() - 1] {
                assert_eq!(parser.accept(b), Outcome::Waiting, "len {len}");
            }
            let last = parser.accept(bytes[bytes.len() - 1]);
            assert_eq!(last, Outcome::Complete(Bytes::from(payload)), "len {len}");
        }
        assert_eq!(parser.frames_completed(), MAX_PAYLOAD as u64);
    }

    #[test]
    fn roundtrip_payload_full_of_markers() {
        let payload = [START_MARKER, END_MARKER, 0x00, START_MARKER];
        let frame = encode(&payload, MAX_FRAME_SIZE).unwrap();
        let mut parser = FrameParser::new();
        let outcomes = parser.feed(frame.as_bytes());
        assert_eq!(outcomes, vec![Outcome::Complete(Bytes::copy_from_slice(&payload))]);
    }

    #[test]
    fn corrupted_checksum_or_terminator_rejects_then_resyncs() {
        let frame = encode(&[0xAA, 0xBB, 0xCC], MAX_FRAME_SIZE).unwrap();
        let wire = frame.as_bytes();
        let checksum_pos = wire.len() - 2;
        let end_pos = wire.len() - 1;

        for pos in [checksum_pos, end_pos] {
            for mask in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = wire.to_vec();
                corrupted[pos] ^= mask;

                let mut parser = FrameParser::new();
                let outcomes = parser.feed(&corrupted);
                assert_eq!(outcomes.len(), 1, "pos {pos} mask {mask:#x}");
                assert!(matches!(outcomes[0], Outcome::Rejected(_)));
                assert!(parser.is_idle());

                let outcomes = parser.feed(wire);
                assert_eq!(
                    outcomes,
                    vec![Outcome::Complete(Bytes::from_static(&[0xAA, 0xBB, 0xCC]))]
                );
            }
        }
    }

    #[test]
    fn noise_then_valid_frame_yields_one_complete() {
        let mut parser = FrameParser::new();
        let noise: Vec<u8> = (0u8..=255).filter(|&b| b != START_MARKER).collect();
        let frame = encode(b"payload", MAX_FRAME_SIZE).unwrap();

        let mut stream = noise.clone();
        stream.extend_from_slice(frame.as_bytes());
        let outcomes = parser.feed(&stream);

        assert_eq!(completes(&outcomes), vec![Bytes::from_static(b"payload")]);
        assert_eq!(rejects(&outcomes), 0);
        assert_eq!(parser.bytes_discarded(), noise.len() as u64);
    }

    #[test]
    fn truncated_frame_is_eventually_dropped() {
        let mut parser = FrameParser::new();
        // Frame announcing 3 bytes that is cut off after one payload byte.
        let mut stream = vec![START_MARKER, 3, 0x11];
        // The next frame's bytes are swallowed as payload, then fail validation.
        stream.extend_from_slice(encode(&[0x10, 0x20, 0x30], MAX_FRAME_SIZE).unwrap().as_bytes());
        stream.extend_from_slice(encode(b"next", MAX_FRAME_SIZE).unwrap().as_bytes());

        let outcomes = parser.feed(&stream);
        assert_eq!(rejects(&outcomes), 1);
        assert_eq!(completes(&outcomes), vec![Bytes::from_static(b"next")]);
    }

    #[test]
    fn start_marker_in_terminator_slot_is_consumed() {
        let mut parser = FrameParser::new();
        let outcomes = parser.feed(&[START_MARKER, 1, 0x05, 0x05, START_MARKER]);
        assert_eq!(
            outcomes,
            vec![Outcome::Rejected(RejectReason::BadTerminator {
                found: START_MARKER
            })]
        );
        assert_eq!(parser.state(), ParserState::AwaitingStart);
    }

    #[test]
    fn reset_drops_frame_in_progress() {
        let mut parser = FrameParser::new();
        parser.feed(&[START_MARKER, 4, 1, 2]);
        parser.reset();
        assert!(parser.is_idle());
        assert!(parser.buffered().is_empty());

        let outcomes = parser.feed(&[START_MARKER, 1, 7, 7, END_MARKER]);
        assert_eq!(outcomes, vec![Outcome::Complete(Bytes::from_static(&[7]))]);
    }

    #[test]
    fn reject_reason_display() {
        let reason = RejectReason::ChecksumMismatch {
            computed: 0x30,
            received: 0xFF,
        };
        assert_eq!(
            reason.to_string(),
            "checksum mismatch (computed 0x30, received 0xFF)"
        );
        assert_eq!(
            RejectReason::BadTerminator { found: 4 }.to_string(),
            "expected end marker 0x03, found 0x04"
        );
    }
}
