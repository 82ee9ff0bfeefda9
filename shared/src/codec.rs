//! Message codec and stream framing
//!
//! A payload is `<TYPE>##<body>` in UTF-8, with no escaping. Because TCP is a
//! byte stream, every payload travels behind a 4-byte big-endian length so that
//! split and coalesced reads both decode to exactly the frames that were sent.

use crate::error::ProtocolError;
use crate::message::{Message, MessageType};
use crate::DELIMITER;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Size of the length header in front of every payload.
pub const FRAME_HEADER_LEN: usize = 4;

/// Encodes one message as its text payload, without the frame header.
pub fn encode(message: &Message) -> Bytes {
    let mut out = BytesMut::with_capacity(message.payload_len());
    out.put_slice(message.kind().as_str().as_bytes());
    out.put_slice(DELIMITER.as_bytes());
    out.put_slice(message.body().as_bytes());
    out.freeze()
}

/// Decodes one text payload.
///
/// Splits once on the first delimiter; a missing body becomes empty text.
pub fn decode(payload: &[u8]) -> Result<Message, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
    let (token, body) = text.split_once(DELIMITER).unwrap_or((text, ""));
    let kind: MessageType = token.parse()?;
    Ok(Message::from_parts(kind, body.to_string()))
}

/// Encodes one message as a complete wire frame, for peers that write frames
/// by hand.
pub fn encode_frame(message: &Message) -> Bytes {
    let payload = encode(message);
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put(payload);
    frame.freeze()
}

/// Length-delimited framing of [`Message`]s with a per-frame size limit.
///
/// A frame declaring more than `max_frame_len` bytes is reported once and its
/// payload is skipped as it arrives, so the stream stays usable.
#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
    max_frame_len: usize,
    discard_remaining: usize,
}

impl FrameCodec {
    pub fn new(max_frame_len: usize) -> Self {
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(FRAME_HEADER_LEN)
            .max_frame_length(max_frame_len)
            .new_codec();
        Self {
            inner,
            max_frame_len,
            discard_remaining: 0,
        }
    }

    /// Appends one framed message to `dst`.
    pub fn encode_message(
        &mut self,
        message: &Message,
        dst: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        let len = message.payload_len();
        self.inner
            .encode(encode(message), dst)
            .map_err(|_| ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            })
    }

    /// Takes the next complete frame out of `src` and decodes it.
    ///
    /// `Ok(None)` means more bytes are needed. An error only concerns the one
    /// frame it names; calling again continues with the frame after it.
    pub fn decode_message(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Message>, ProtocolError> {
        if self.discard_remaining > 0 {
            let skipped = self.discard_remaining.min(src.len());
            src.advance(skipped);
            self.discard_remaining -= skipped;
            if self.discard_remaining > 0 {
                return Ok(None);
            }
        }

        match self.inner.decode(src) {
            Ok(Some(payload)) => decode(&payload).map(Some),
            Ok(None) => Ok(None),
            // The only decode failure is a length above the limit. The header
            // is still in `src`.
            Err(_) => {
                let len = src.get_u32() as usize;
                self.discard_remaining = len;
                Err(ProtocolError::FrameTooLarge {
                    len,
                    max: self.max_frame_len,
                })
            }
        }
    }
}
