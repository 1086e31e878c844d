//! The shared, append-only message log every session replays from.
//!
//! Positions handed out by [`MessageLog::append`] are stable: the message at a position never
//! changes and a position is never reused. Appends and length reads happen under one lock, so
//! every observer sees the same total order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::message::{now, Message};

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Mutex<Vec<Arc<Message>>>,
    appended: Notify,
}

impl MessageLog {
    pub fn new() -> MessageLog {
        MessageLog::default()
    }

    /// Pushes `message` to the end of the log, wakes every waiter and returns the position the
    /// message landed at.
    ///
    /// The message is stamped here, under the lock, never earlier than the entry before it.
    pub fn append(&self, message: Message) -> usize {
        let position = {
            let mut messages = self.messages.lock();
            let floor = messages.last().map_or(0, |last| last.timestamp());
            messages.push(Arc::new(message.stamped(now().max(floor))));
            messages.len() - 1
        };
        self.appended.notify_waiters();
        position
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A consistent snapshot of positions `[from, to)`. The range is clamped to the current
    /// length, so asking past the end yields whatever exists.
    pub fn read_range(&self, from: usize, to: usize) -> Vec<Arc<Message>> {
        let messages = self.messages.lock();
        let to = to.min(messages.len());
        if from >= to {
            return Vec::new();
        }
        messages[from..to].to_vec()
    }

    /// Everything from `from` to the current end of the log.
    pub fn read_from(&self, from: usize) -> Vec<Arc<Message>> {
        self.read_range(from, usize::MAX)
    }

    /// Where a newly joined session should start reading so that it replays at most
    /// `replay` earlier messages.
    pub fn backlog_start(&self, replay: usize) -> usize {
        self.len().saturating_sub(replay)
    }

    /// Resolves once the log holds more than `seen` messages.
    ///
    /// Interest in the next append is registered before the length is checked, so an append
    /// racing with this call cannot slip between the check and the wait.
    pub async fn wait_for_more(&self, seen: usize) {
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.len() > seen {
                return;
            }
            notified.await;
        }
    }
}
