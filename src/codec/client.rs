//! The client's half of the conversation: chat lines out, broadcasts in.

use std::fmt;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::text::next_line;
use super::{binary, lossy, Protocol};
use crate::error::{ChatError, Result};
use crate::message::Message;

/// A broadcast as the client sees it. v1 servers send pre-rendered lines; v2 servers send the
/// structured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast {
    Line(String),
    Message(Message),
}

impl fmt::Display for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Broadcast::Line(line) => write!(f, "{}", line),
            Broadcast::Message(message) => write!(f, "{}", message.display_timed()),
        }
    }
}

#[derive(Debug)]
pub struct ClientCodec {
    protocol: Protocol,
    scanned: usize,
}

impl ClientCodec {
    pub fn new(protocol: Protocol) -> ClientCodec {
        ClientCodec {
            protocol,
            scanned: 0,
        }
    }
}

impl Decoder for ClientCodec {
    type Item = Broadcast;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Broadcast>> {
        Ok(match self.protocol {
            Protocol::Text => {
                next_line(src, &mut self.scanned).map(|line| Broadcast::Line(lossy(&line)))
            }
            Protocol::Binary => binary::decode_broadcast(src).map(Broadcast::Message),
        })
    }
}

impl<'a> Encoder<&'a str> for ClientCodec {
    type Error = ChatError;

    fn encode(&mut self, line: &'a str, dst: &mut BytesMut) -> Result<()> {
        match self.protocol {
            Protocol::Text => {
                dst.reserve(line.len() + 1);
                dst.put_slice(line.as_bytes());
                dst.put_u8(b'\n');
            }
            Protocol::Binary => binary::encode_chat(line, dst),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_broadcasts_are_lines() {
        let mut codec = ClientCodec::new(Protocol::Text);
        let mut buf = BytesMut::from(&b"[alice] hi\nbob conn"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Broadcast::Line("[alice] hi".to_string()))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn binary_broadcasts_are_messages() {
        let mut codec = ClientCodec::new(Protocol::Binary);
        let mut buf = BytesMut::from(&[0, 0, 0, 0, 0, 2, 0, b'o', b'k'][..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Broadcast::Message(Message::with_timestamp("", "ok", 0)))
        );
    }

    #[test]
    fn chat_lines_follow_the_protocol() {
        let mut dst = BytesMut::new();
        ClientCodec::new(Protocol::Text).encode("hi", &mut dst).unwrap();
        assert_eq!(&dst[..], b"hi\n");

        dst.clear();
        ClientCodec::new(Protocol::Binary).encode("hi", &mut dst).unwrap();
        assert_eq!(&dst[..], &[0x00, 0x02, b'h', b'i']);
    }
}
