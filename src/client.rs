//! A plain line-mode client: stdin lines go out as chat frames, broadcasts are printed to
//! stdout as they arrive.

use std::io;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::codec::client::{Broadcast, ClientCodec};
use crate::codec::{LoginRequest, LoginStatus, Protocol};
use crate::error::{ChatError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub address: String,
    pub port: u16,
    pub username: String,
    /// Supplying a password selects the binary protocol.
    pub password: Option<String>,
}

impl ClientConfig {
    pub fn login(&self) -> LoginRequest {
        match &self.password {
            Some(password) => LoginRequest::binary(self.username.as_str(), password.as_str()),
            None => LoginRequest::text(self.username.as_str()),
        }
    }
}

/// A logged in connection to a chat server.
pub struct Connection {
    frames: FramedRead<OwnedReadHalf, ClientCodec>,
    sink: FramedWrite<OwnedWriteHalf, ClientCodec>,
}

impl Connection {
    /// Connects and logs in. For the binary protocol this waits for the server's status byte
    /// and fails with [`ChatError::LoginRejected`] unless it accepts.
    pub async fn connect<A: ToSocketAddrs>(addr: A, login: LoginRequest) -> Result<Connection> {
        let mut frame = BytesMut::new();
        login.encode(&mut frame)?;

        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(&frame).await?;

        if login.protocol == Protocol::Binary {
            let status = stream.read_u8().await?;
            if status != LoginStatus::Accepted.as_byte() {
                return Err(ChatError::LoginRejected(status));
            }
        }

        let (reader, writer) = stream.into_split();
        Ok(Connection {
            frames: FramedRead::new(reader, ClientCodec::new(login.protocol)),
            sink: FramedWrite::new(writer, ClientCodec::new(login.protocol)),
        })
    }

    pub async fn send(&mut self, line: &str) -> Result<()> {
        self.sink.send(line).await
    }

    /// The next broadcast, or [`ChatError::Disconnected`] once the server hangs up.
    pub async fn next_broadcast(&mut self) -> Result<Broadcast> {
        match self.frames.next().await {
            Some(broadcast) => broadcast,
            None => Err(ChatError::Disconnected),
        }
    }
}

/// Relays stdin and stdout until stdin closes or the server goes away.
pub async fn run(config: ClientConfig) -> Result<()> {
    let login = config.login();
    let connection = Connection::connect((config.address.as_str(), config.port), login).await?;
    info!(
        "logged in to {}:{} as {}",
        config.address, config.port, config.username
    );
    let Connection {
        mut frames,
        mut sink,
    } = connection;

    let mut stdin = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    loop {
        tokio::select! {
            line = stdin.next() => match line {
                Some(line) => {
                    let line = line.map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                    sink.send(line.as_str()).await?;
                }
                None => {
                    debug!("stdin closed");
                    return Ok(());
                }
            },
            broadcast = frames.next() => match broadcast {
                Some(broadcast) => println!("{}", broadcast?),
                None => return Err(ChatError::Disconnected),
            },
        }
    }
}
