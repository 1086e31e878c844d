//! The first frame of every connection: protocol version plus credentials.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Decoder;

use super::buffer::FrameBuf;
use super::{lossy, strip_cr, Protocol};
use crate::error::{ChatError, Result};

/// A decoded login frame. Structure only; see [`LoginRequest::validate`] for the content rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub protocol: Protocol,
    pub username: String,
    /// Only v2 carries a password. It is handed over but never checked.
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn text(username: impl Into<String>) -> LoginRequest {
        LoginRequest {
            protocol: Protocol::Text,
            username: username.into(),
            password: None,
        }
    }

    pub fn binary(username: impl Into<String>, password: impl Into<String>) -> LoginRequest {
        LoginRequest {
            protocol: Protocol::Binary,
            username: username.into(),
            password: Some(password.into()),
        }
    }

    /// Usernames must be non-empty, and so must v2 passwords.
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(ChatError::EmptyUsername);
        }
        if self.protocol == Protocol::Binary
            && self.password.as_deref().map_or(true, str::is_empty)
        {
            return Err(ChatError::EmptyPassword);
        }
        Ok(())
    }

    /// Client side encoding of the login frame.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(self.protocol.version_byte());
        match self.protocol {
            Protocol::Text => {
                dst.put_slice(self.username.as_bytes());
                dst.put_u8(b'\n');
            }
            Protocol::Binary => {
                let password = self.password.as_deref().unwrap_or("");
                put_short_field(dst, "username", &self.username)?;
                put_short_field(dst, "password", password)?;
            }
        }
        Ok(())
    }
}

fn put_short_field(dst: &mut BytesMut, field: &'static str, value: &str) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| ChatError::FieldTooLong {
        field,
        len: value.len(),
        max: u8::MAX as usize,
    })?;
    dst.put_u8(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Decodes the login frame of either version. Bytes following the frame stay in the buffer for
/// the chat codec that takes over afterwards.
#[derive(Debug, Default)]
pub struct LoginCodec {
    // How far a v1 login has already been scanned for its newline.
    scanned: usize,
}

impl LoginCodec {
    pub fn new() -> LoginCodec {
        LoginCodec::default()
    }

    fn decode_text(&mut self, src: &mut BytesMut) -> Result<Option<LoginRequest>> {
        let end = match src.peek_delimiter(b'\n', self.scanned.max(1)) {
            Some(end) => end,
            None => {
                self.scanned = src.len();
                return Ok(None);
            }
        };
        self.scanned = 0;

        let mut frame = src.split_to(end + 1);
        frame.advance(1);
        frame.truncate(frame.len() - 1);
        strip_cr(&mut frame);
        Ok(Some(LoginRequest::text(lossy(&frame))))
    }

    fn decode_binary(&mut self, src: &mut BytesMut) -> Result<Option<LoginRequest>> {
        let name_len = match src.peek_u8(1) {
            Some(len) => usize::from(len),
            None => return Ok(None),
        };
        let pass_at = 2 + name_len;
        let pass_len = match src.peek_u8(pass_at) {
            Some(len) => usize::from(len),
            None => return Ok(None),
        };
        let total = pass_at + 1 + pass_len;
        let frame = match src.take_exact(total) {
            Some(frame) => frame,
            None => {
                src.reserve(total - src.len());
                return Ok(None);
            }
        };
        Ok(Some(LoginRequest::binary(
            lossy(&frame[2..pass_at]),
            lossy(&frame[pass_at + 1..]),
        )))
    }
}

impl Decoder for LoginCodec {
    type Item = LoginRequest;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LoginRequest>> {
        let protocol = match src.peek_u8(0) {
            Some(byte) => Protocol::try_from(byte)?,
            None => return Ok(None),
        };
        match protocol {
            Protocol::Text => self.decode_text(src),
            Protocol::Binary => self.decode_binary(src),
        }
    }

    /// A connection that closes halfway through its login simply never logs in.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<LoginRequest>> {
        let login = self.decode(src)?;
        if login.is_none() {
            src.clear();
        }
        Ok(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_login_leaves_chat_bytes_behind() {
        let mut codec = LoginCodec::new();
        let mut buf = BytesMut::from(&b"\x01alice\nhi\n"[..]);
        let login = codec.decode(&mut buf).unwrap().expect("complete login");
        assert_eq!(login, LoginRequest::text("alice"));
        assert_eq!(&buf[..], b"hi\n");
    }

    #[test]
    fn text_login_split_across_reads() {
        let mut codec = LoginCodec::new();
        let mut buf = BytesMut::from(&b"\x01al"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"ice\r\n");
        let login = codec.decode(&mut buf).unwrap().expect("complete login");
        assert_eq!(login.username, "alice");
        assert!(buf.is_empty());
    }

    #[test]
    fn binary_login_waits_for_every_field() {
        let frame = b"\x02\x03bob\x04pass";
        let mut codec = LoginCodec::new();
        let mut buf = BytesMut::new();
        for byte in &frame[..frame.len() - 1] {
            buf.put_u8(*byte);
            assert!(codec.decode(&mut buf).unwrap().is_none());
        }
        buf.put_u8(frame[frame.len() - 1]);
        let login = codec.decode(&mut buf).unwrap().expect("complete login");
        assert_eq!(login, LoginRequest::binary("bob", "pass"));
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_version_is_rejected_immediately() {
        let mut codec = LoginCodec::new();
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ChatError::UnsupportedVersion(b'G'))
        ));
    }

    #[test]
    fn partial_login_at_eof_yields_nothing() {
        let mut codec = LoginCodec::new();
        let mut buf = BytesMut::from(&b"\x02\x05ev"[..]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn validation_rules() {
        assert!(LoginRequest::text("alice").validate().is_ok());
        assert!(LoginRequest::binary("bob", "pass").validate().is_ok());
        assert!(matches!(
            LoginRequest::text("").validate(),
            Err(ChatError::EmptyUsername)
        ));
        assert!(matches!(
            LoginRequest::binary("bob", "").validate(),
            Err(ChatError::EmptyPassword)
        ));
    }

    #[test]
    fn encoded_login_decodes_back() {
        let mut buf = BytesMut::new();
        let login = LoginRequest::binary("bob", "pass");
        login.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], b"\x02\x03bob\x04pass");
        assert_eq!(LoginCodec::new().decode(&mut buf).unwrap(), Some(login));
    }

    #[test]
    fn oversized_binary_field_is_an_error() {
        let mut buf = BytesMut::new();
        let login = LoginRequest::binary("x".repeat(256), "pass");
        assert!(matches!(
            login.encode(&mut buf),
            Err(ChatError::FieldTooLong { field: "username", len: 256, max: 255 })
        ));
    }
}
