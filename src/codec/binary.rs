//! Protocol v2: length prefixed binary frames.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::buffer::FrameBuf;
use super::{clip, lossy, LoginStatus, Protocol, ProtocolCodec};
use crate::error::{ChatError, Result};
use crate::message::Message;

/// `len u16` in front of every chat frame.
const CHAT_HEADER_LEN: usize = 2;
/// Sender length, timestamp and body length of a broadcast.
pub const BROADCAST_HEADER_LEN: usize = 7;

const MAX_SENDER_LEN: usize = u8::MAX as usize;
const MAX_BODY_LEN: usize = u16::MAX as usize;

#[derive(Debug, Default)]
pub struct BinaryCodec;

impl Decoder for BinaryCodec {
    type Item = String;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let body_len = match src.peek_u16_be(0) {
            Some(len) => usize::from(len),
            None => return Ok(None),
        };
        let total = CHAT_HEADER_LEN + body_len;
        let mut frame = match src.take_exact(total) {
            Some(frame) => frame,
            None => {
                src.reserve(total - src.len());
                return Ok(None);
            }
        };
        frame.advance(CHAT_HEADER_LEN);
        Ok(Some(lossy(&frame)))
    }

    /// A frame cut short by end of stream is discarded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let body = self.decode(src)?;
        if body.is_none() {
            src.clear();
        }
        Ok(body)
    }
}

/// Fields too long for their length prefix (a v1 user can type a line of any length) are
/// clipped rather than failing the receiving session.
impl Encoder<Arc<Message>> for BinaryCodec {
    type Error = ChatError;

    fn encode(&mut self, message: Arc<Message>, dst: &mut BytesMut) -> Result<()> {
        let sender = clip(message.sender(), MAX_SENDER_LEN);
        let body = clip(message.body(), MAX_BODY_LEN);

        dst.reserve(BROADCAST_HEADER_LEN + sender.len() + body.len());
        dst.put_u8(sender.len() as u8);
        dst.put_slice(sender.as_bytes());
        dst.put_u32_le(message.timestamp());
        dst.put_u16_le(body.len() as u16);
        dst.put_slice(body.as_bytes());
        Ok(())
    }
}

impl ProtocolCodec for BinaryCodec {
    const PROTOCOL: Protocol = Protocol::Binary;

    fn encode_login_reply(status: LoginStatus, dst: &mut BytesMut) {
        dst.put_u8(status.as_byte());
    }
}

/// Client side: decodes one broadcast once all of it has arrived.
pub(crate) fn decode_broadcast(src: &mut BytesMut) -> Option<Message> {
    let sender_len = usize::from(src.peek_u8(0)?);
    let timestamp = src.peek_u32_le(1 + sender_len)?;
    let body_len = usize::from(src.peek_u16_le(5 + sender_len)?);
    let total = BROADCAST_HEADER_LEN + sender_len + body_len;
    let frame = match src.take_exact(total) {
        Some(frame) => frame,
        None => {
            src.reserve(total - src.len());
            return None;
        }
    };
    let body_at = BROADCAST_HEADER_LEN + sender_len;
    Some(Message::with_timestamp(
        lossy(&frame[1..1 + sender_len]),
        lossy(&frame[body_at..]),
        timestamp,
    ))
}

/// Client side: frames one chat line, clipping it to the longest body a frame can carry.
pub(crate) fn encode_chat(body: &str, dst: &mut BytesMut) {
    let body = clip(body, MAX_BODY_LEN);
    dst.reserve(CHAT_HEADER_LEN + body.len());
    dst.put_u16(body.len() as u16);
    dst.put_slice(body.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frame_split_across_reads() {
        let mut codec = BinaryCodec;
        let mut buf = BytesMut::from(&[0x00, 0x05, b'h', b'e'][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        // Nothing is consumed while the frame is incomplete.
        assert_eq!(&buf[..], &[0x00, 0x05, b'h', b'e']);

        buf.extend_from_slice(b"llo\x00\x02ok");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("hello"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ok"));
        assert!(buf.is_empty());
    }

    #[test]
    fn lone_header_byte_waits() {
        let mut codec = BinaryCodec;
        let mut buf = BytesMut::from(&[0x01][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn empty_chat_frame_is_a_message() {
        let mut codec = BinaryCodec;
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn broadcast_layout() {
        let mut dst = BytesMut::new();
        BinaryCodec
            .encode(
                Arc::new(Message::with_timestamp("al", "hey", 0x0102_0304)),
                &mut dst,
            )
            .unwrap();
        assert_eq!(
            &dst[..],
            &[2, b'a', b'l', 0x04, 0x03, 0x02, 0x01, 3, 0, b'h', b'e', b'y']
        );
    }

    #[test]
    fn notice_has_zero_length_sender() {
        let mut dst = BytesMut::new();
        BinaryCodec
            .encode(Arc::new(Message::with_timestamp("", "x", 0)), &mut dst)
            .unwrap();
        assert_eq!(dst.len(), BROADCAST_HEADER_LEN + 1);
        assert_eq!(dst[0], 0);
    }

    #[test]
    fn broadcast_round_trip_survives_partial_delivery() {
        let original = Message::with_timestamp("bob", "hello there", 1_700_000_123);
        let mut encoded = BytesMut::new();
        BinaryCodec
            .encode(Arc::new(original.clone()), &mut encoded)
            .unwrap();

        let mut buf = BytesMut::new();
        let split = encoded.len() - 4;
        buf.extend_from_slice(&encoded[..split]);
        assert_eq!(decode_broadcast(&mut buf), None);
        buf.extend_from_slice(&encoded[split..]);
        assert_eq!(decode_broadcast(&mut buf), Some(original));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_fields_are_clipped() {
        let mut dst = BytesMut::new();
        let long_name = "n".repeat(300);
        BinaryCodec
            .encode(
                Arc::new(Message::with_timestamp(long_name, "body", 0)),
                &mut dst,
            )
            .unwrap();
        let decoded = decode_broadcast(&mut dst).expect("complete broadcast");
        assert_eq!(decoded.sender().len(), MAX_SENDER_LEN);
        assert_eq!(decoded.body(), "body");
    }

    #[test]
    fn login_reply_is_one_status_byte() {
        let mut dst = BytesMut::new();
        BinaryCodec::encode_login_reply(LoginStatus::Accepted, &mut dst);
        BinaryCodec::encode_login_reply(LoginStatus::Rejected, &mut dst);
        assert_eq!(&dst[..], &[0x00, 0x01]);
    }

    #[test]
    fn chat_encoding_is_big_endian() {
        let mut dst = BytesMut::new();
        encode_chat("hi", &mut dst);
        assert_eq!(&dst[..], &[0x00, 0x02, b'h', b'i']);
    }
}
