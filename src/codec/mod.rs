//! Wire framing for both protocol versions.
//!
//! v1 (text):
//!
//! ```text
//! login:     0x01 <username> \n
//! chat:      <body> \n
//! broadcast: [<sender>] <body> \n      or      <body> \n   for notices
//! ```
//!
//! v2 (binary, length prefixed):
//!
//! ```text
//! login:       0x02 <ulen u8><username><plen u8><password>
//! login reply: <status u8>                    0x00 accepted, anything else rejected
//! chat:        <len u16 be><body>
//! broadcast:   <slen u8><sender><timestamp u32 le><blen u16 le><body>
//! ```
//!
//! The version is picked from the first byte a connection sends and never changes afterwards.
//! Each version is a [`ProtocolCodec`], and a session is monomorphised over the one it
//! negotiated.

use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ChatError;
use crate::message::Message;

pub mod binary;
pub mod buffer;
pub mod client;
pub mod login;
pub mod text;

pub use self::binary::BinaryCodec;
pub use self::client::ClientCodec;
pub use self::login::{LoginCodec, LoginRequest};
pub use self::text::TextCodec;

/// Protocol versions, named for how they frame chat traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// v1: newline terminated lines.
    Text,
    /// v2: length prefixed binary frames.
    Binary,
}

impl Protocol {
    pub fn version_byte(self) -> u8 {
        match self {
            Protocol::Text => 0x01,
            Protocol::Binary => 0x02,
        }
    }
}

impl TryFrom<u8> for Protocol {
    type Error = ChatError;

    fn try_from(byte: u8) -> Result<Protocol, ChatError> {
        match byte {
            0x01 => Ok(Protocol::Text),
            0x02 => Ok(Protocol::Binary),
            other => Err(ChatError::UnsupportedVersion(other)),
        }
    }
}

/// Answer to a login, carried on the wire only by v2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    Accepted,
    Rejected,
}

impl LoginStatus {
    pub fn as_byte(self) -> u8 {
        match self {
            LoginStatus::Accepted => 0x00,
            LoginStatus::Rejected => 0x01,
        }
    }
}

/// Server side behaviour of one protocol version: decoding a client's chat frames into bodies,
/// encoding broadcasts, and answering a login.
pub trait ProtocolCodec:
    Decoder<Item = String, Error = ChatError>
    + Encoder<Arc<Message>, Error = ChatError>
    + Default
    + Send
    + Unpin
    + 'static
{
    const PROTOCOL: Protocol;

    /// Writes the login reply for `status` into `dst`, if this version has one.
    fn encode_login_reply(status: LoginStatus, dst: &mut BytesMut);
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
pub(crate) fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Decodes a frame payload, replacing invalid UTF-8 rather than failing.
pub(crate) fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Drops a trailing carriage return left by `\r\n` line endings.
pub(crate) fn strip_cr(line: &mut BytesMut) {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
}
