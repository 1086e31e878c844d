//! Protocol v1: newline terminated text.

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::buffer::FrameBuf;
use super::{lossy, strip_cr, LoginStatus, Protocol, ProtocolCodec};
use crate::error::{ChatError, Result};
use crate::message::Message;

/// Splits the next complete line off `src`, without its terminator. `scanned` remembers how much
/// of an unterminated line was already searched so long lines are not rescanned on every read.
pub(crate) fn next_line(src: &mut BytesMut, scanned: &mut usize) -> Option<BytesMut> {
    let end = match src.peek_delimiter(b'\n', *scanned) {
        Some(end) => end,
        None => {
            *scanned = src.len();
            return None;
        }
    };
    *scanned = 0;
    let mut line = src.split_to(end + 1);
    line.truncate(end);
    strip_cr(&mut line);
    Some(line)
}

/// Backspace and NUL would garble the terminals of everyone reading the line.
fn sanitize(line: &mut [u8]) {
    for byte in line.iter_mut() {
        if *byte == b'\x08' || *byte == b'\0' {
            *byte = b' ';
        }
    }
}

#[derive(Debug, Default)]
pub struct TextCodec {
    scanned: usize,
}

impl Decoder for TextCodec {
    type Item = String;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        Ok(next_line(src, &mut self.scanned).map(|mut line| {
            sanitize(&mut line);
            lossy(&line)
        }))
    }

    /// An unterminated line at end of stream is discarded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let line = self.decode(src)?;
        if line.is_none() {
            src.clear();
        }
        Ok(line)
    }
}

impl Encoder<Arc<Message>> for TextCodec {
    type Error = ChatError;

    fn encode(&mut self, message: Arc<Message>, dst: &mut BytesMut) -> Result<()> {
        let line = message.to_string();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl ProtocolCodec for TextCodec {
    const PROTOCOL: Protocol = Protocol::Text;

    fn encode_login_reply(_status: LoginStatus, _dst: &mut BytesMut) {}
}
