//! Defines IO with one connected chat client.
//!
//! A session starts out waiting for a login frame. Once the login decodes, the session appends a
//! connect notice and splits into two duties:
//!
//! * the Receiver (the session's own task) decodes chat frames and appends them to the log;
//! * the Sender (a spawned task) replays the log from the session's cursor to the socket, then
//!   parks on [`MessageLog::wait_for_more`] until something new arrives.
//!
//! Whichever duty fails first closes the session. The Receiver then marks it closed and appends
//! the disconnect notice, and that append is also what wakes a parked Sender so it can exit.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::{
    BinaryCodec, LoginCodec, LoginRequest, LoginStatus, Protocol, ProtocolCodec, TextCodec,
};
use crate::error::Result;
use crate::message::Message;
use crate::message_log::MessageLog;
use crate::READ_BUFFER_SIZE;

pub struct Session {
    /// Who is on the other end, for logging before a username is known.
    peer: String,
    log: Arc<MessageLog>,
    backlog_replay: usize,
}

impl Session {
    pub fn new(peer: impl Into<String>, log: Arc<MessageLog>, backlog_replay: usize) -> Session {
        Session {
            peer: peer.into(),
            log,
            backlog_replay,
        }
    }

    /// Drives the connection until it closes.
    ///
    /// Errors are only returned for connections that never completed a login; once a client is
    /// logged in, transport failures end the session quietly after the disconnect notice.
    pub async fn run<S>(self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut frames = FramedRead::with_capacity(reader, LoginCodec::new(), READ_BUFFER_SIZE);

        let login = match frames.next().await {
            Some(login) => login?,
            None => {
                debug!("{}: closed before logging in", self.peer);
                return Ok(());
            }
        };

        match login.protocol {
            Protocol::Text => self.serve::<TextCodec, S>(frames, writer, login).await,
            Protocol::Binary => self.serve::<BinaryCodec, S>(frames, writer, login).await,
        }
    }

    async fn serve<C, S>(
        self,
        frames: FramedRead<ReadHalf<S>, LoginCodec>,
        writer: WriteHalf<S>,
        login: LoginRequest,
    ) -> Result<()>
    where
        C: ProtocolCodec,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut sink = FramedWrite::new(writer, C::default());

        if let Err(err) = login.validate() {
            C::encode_login_reply(LoginStatus::Rejected, sink.write_buffer_mut());
            // The peer is dropped either way; the rejection byte is a courtesy.
            let _ = sink.flush().await;
            return Err(err);
        }
        C::encode_login_reply(LoginStatus::Accepted, sink.write_buffer_mut());
        sink.flush().await?;

        let username = login.username;
        let cursor = self.log.backlog_start(self.backlog_replay);
        self.log.append(Message::notice(format!("{} connected.", username)));
        info!(
            "{} logged in as {} using {:?} framing",
            self.peer,
            username,
            C::PROTOCOL
        );

        let closed = CancellationToken::new();
        let sender = tokio::spawn(run_sender(self.log.clone(), sink, cursor, closed.clone()));

        let mut frames = frames.map_decoder(|_| C::default());
        let received = loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(body)) => {
                        let position = self.log.append(Message::chat(username.as_str(), body));
                        debug!("{}: message appended at {}", username, position);
                    }
                    Some(Err(err)) => break Err(err),
                    None => break Ok(()),
                },
                _ = closed.cancelled() => break Ok(()),
            }
        };

        closed.cancel();
        drop(frames);
        self.log.append(Message::notice(format!("{} disconnected.", username)));

        if let Err(err) = received {
            warn!("{}: read failed: {}", username, err);
        }
        match sender.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("{}: write failed: {}", username, err),
            Err(err) => warn!("{}: sender task ended abnormally: {}", username, err),
        }
        info!("{} ({}) disconnected", username, self.peer);
        Ok(())
    }
}

/// The Sender duty. Marks the session closed when it stops, so a write failure also brings the
/// Receiver down.
async fn run_sender<C, W>(
    log: Arc<MessageLog>,
    mut sink: FramedWrite<W, C>,
    mut cursor: usize,
    closed: CancellationToken,
) -> Result<()>
where
    C: ProtocolCodec,
    W: AsyncWrite + Unpin,
{
    let result = send_pending(&log, &mut sink, &mut cursor, &closed).await;
    closed.cancel();
    result
}

/// Writes every message from `cursor` on, in log order, advancing `cursor` past each one
/// written. Parks on the log whenever it has caught up.
async fn send_pending<C, W>(
    log: &MessageLog,
    sink: &mut FramedWrite<W, C>,
    cursor: &mut usize,
    closed: &CancellationToken,
) -> Result<()>
where
    C: ProtocolCodec,
    W: AsyncWrite + Unpin,
{
    while !closed.is_cancelled() {
        let pending = log.read_from(*cursor);
        if pending.is_empty() {
            log.wait_for_more(*cursor).await;
            continue;
        }

        // A peer that stops reading must not keep a closed session alive.
        let write = async {
            for message in pending {
                sink.feed(message).await?;
                *cursor += 1;
            }
            sink.flush().await
        };
        tokio::select! {
            written = write => written?,
            _ = closed.cancelled() => break,
        }
    }
    Ok(())
}
