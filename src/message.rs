//! The unit of chat traffic stored in the shared log.

use std::fmt;

use chrono::{Local, TimeZone, Utc};

/// One broadcast line. An empty `sender` marks a system notice (connects and disconnects).
///
/// Messages are immutable once built; the log hands out shared references to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: String,
    body: String,
    timestamp: u32,
}

impl Message {
    /// A message authored by `sender`, stamped with the current time.
    pub fn chat(sender: impl Into<String>, body: impl Into<String>) -> Message {
        Message::with_timestamp(sender, body, now())
    }

    /// A server generated notice, stamped with the current time.
    pub fn notice(body: impl Into<String>) -> Message {
        Message::with_timestamp(String::new(), body, now())
    }

    pub fn with_timestamp(
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: u32,
    ) -> Message {
        Message {
            sender: sender.into(),
            body: body.into(),
            timestamp,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn is_notice(&self) -> bool {
        self.sender.is_empty()
    }

    /// Renders the message the way the line based client shows it, prefixed with the local
    /// wall-clock time it was stamped with.
    pub fn display_timed(&self) -> String {
        let clock = Local
            .timestamp_opt(i64::from(self.timestamp), 0)
            .single()
            .map(|time| time.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("[{}] {}", clock, self)
    }

    /// The same message with its timestamp replaced.
    pub(crate) fn stamped(self, timestamp: u32) -> Message {
        Message { timestamp, ..self }
    }
}

/// `[sender] body`, or just `body` for notices. This is exactly the v1 wire rendering minus the
/// trailing newline.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_notice() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "[{}] {}", self.sender, self.body)
        }
    }
}

pub(crate) fn now() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}
