//! Accepts connections and hands each one to its own [`Session`].

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::{info, warn};
use tokio::net::TcpListener;

use crate::message_log::MessageLog;
use crate::session::Session;
use crate::DEFAULT_BACKLOG_REPLAY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// How many earlier messages a newly joined client is sent.
    pub backlog_replay: usize,
}

impl ServerConfig {
    /// Listen on every interface at `port`, with the default backlog replay.
    pub fn new(port: u16) -> ServerConfig {
        ServerConfig {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            backlog_replay: DEFAULT_BACKLOG_REPLAY,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    log: Arc<MessageLog>,
    config: ServerConfig,
}

impl Server {
    /// Binds the listening socket with a fresh, empty log.
    pub async fn bind(config: ServerConfig) -> io::Result<Server> {
        Server::with_log(config, Arc::new(MessageLog::new())).await
    }

    pub async fn with_log(config: ServerConfig, log: Arc<MessageLog>) -> io::Result<Server> {
        let listener = TcpListener::bind(config.listen).await?;
        Ok(Server {
            listener,
            log,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn log(&self) -> Arc<MessageLog> {
        self.log.clone()
    }

    /// Accepts forever. A failed accept is logged and skipped; it never stops the server.
    pub async fn run(self) -> io::Result<()> {
        info!("listening on {}", self.local_addr()?);
        loop {
            let (socket, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("error accepting incoming connection: {}", err);
                    continue;
                }
            };
            info!("{} connected", addr);

            let session = Session::new(
                addr.to_string(),
                self.log.clone(),
                self.config.backlog_replay,
            );
            tokio::spawn(async move {
                if let Err(err) = session.run(socket).await {
                    warn!("{}: session ended before login: {}", addr, err);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_everywhere() {
        let config = ServerConfig::new(4000);
        assert_eq!(config.listen.port(), 4000);
        assert!(config.listen.ip().is_unspecified());
        assert_eq!(config.backlog_replay, DEFAULT_BACKLOG_REPLAY);
    }

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let mut config = ServerConfig::new(0);
        config.listen.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let server = Server::bind(config).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert!(server.log().is_empty());
    }
}
