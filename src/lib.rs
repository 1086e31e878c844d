//! # A line/binary framed chat server.
//!
//! Clients connect over TCP, log in with a username (and, in the binary protocol, a password
//! that is handed over unchecked), send lines of text and receive every message any client has
//! sent, including the most recent backlog from before they joined.
//!
//! Two wire protocols coexist and are told apart by the first byte a client sends:
//!
//! 1. `0x01`: text. Logins and chat are newline terminated lines.
//! 2. `0x02`: binary. Logins and chat are length prefixed, broadcasts carry a timestamp.
//!
//! See [`codec`] for the exact byte layouts.
//!
//! Every message lands in one shared, append-only [`MessageLog`](message_log::MessageLog). Each
//! connection keeps its own cursor into that log and replays from it, so all clients see the
//! same messages in the same order, however far behind an individual client happens to be.
//!
//! Architecture:
//!
//! ```text
//!  TcpListener
//!     v
//! +-----------+              +----------------------+   append   +------------+
//! | TcpStream |--decode----->| Session: Receiver    |----------->|            |
//! |           |              +----------------------+            | MessageLog |
//! |           |<--encode-----| Session: Sender      |<-----------|            |
//! +-----------+              +----------------------+ read/wait  |            |
//! | TcpStream |<-codec------>| Session ...          |<---------->|            |
//! +-----------+              +----------------------+            +------------+
//! | ...       |   ...        | ...                  |
//! +-----------+              +----------------------+
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod message_log;
pub mod server;
pub mod session;

pub use error::{ChatError, Result};
pub use message::Message;
pub use message_log::MessageLog;
pub use server::{Server, ServerConfig};
pub use session::Session;

/// How many earlier messages a client is sent when it joins, unless configured otherwise.
pub const DEFAULT_BACKLOG_REPLAY: usize = 9;

/// Initial capacity of a connection's receive buffer. Frames longer than this still decode;
/// the buffer grows as needed.
pub const READ_BUFFER_SIZE: usize = 1024;
