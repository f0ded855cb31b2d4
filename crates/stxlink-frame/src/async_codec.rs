//! `tokio-util` codec adapter over [`FrameParser`].

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::encode_into;
use crate::error::{FrameError, Result};
use crate::parser::{FrameParser, Outcome};

/// Stream codec yielding payloads of valid frames.
///
/// Rejected frames are skipped and counted, matching [`crate::FrameReader::read_frame`].
#[derive(Debug, Default)]
pub struct StxCodec {
    parser: FrameParser,
}

impl StxCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the parser (state and counters).
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }
}

impl Decoder for StxCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        while src.has_remaining() {
            match self.parser.accept(src.get_u8()) {
                Outcome::Complete(payload) => return Ok(Some(payload)),
                Outcome::Rejected(reason) => {
                    debug!(%reason, "skipping rejected frame");
                }
                Outcome::Waiting => {}
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(payload) = self.decode(src)? {
            return Ok(Some(payload));
        }
        if self.parser.is_idle() {
            Ok(None)
        } else {
            self.parser.reset();
            Err(FrameError::ConnectionClosed)
        }
    }
}

impl Encoder<&[u8]> for StxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        encode_into(item, dst)
    }
}

impl Encoder<Bytes> for StxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_into(&item, dst)
    }
}
