//! Errors raised while framing, logging in, or relaying chat traffic.
//!
//! Every variant is local to one connection: a session that hits one of these closes itself and
//! nothing else.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The first byte of a connection named a protocol version we do not speak.
    #[error("unsupported protocol version byte {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("login frame carries an empty username")]
    EmptyUsername,

    #[error("login frame carries an empty password")]
    EmptyPassword,

    /// A field is too long for the width of its length prefix.
    #[error("{field} is {len} bytes, the length prefix allows at most {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The server answered a v2 login with a nonzero status byte.
    #[error("login rejected by server (status {0:#04x})")]
    LoginRejected(u8),

    #[error("server disconnected")]
    Disconnected,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
