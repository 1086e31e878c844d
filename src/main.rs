use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;

use relaychat::client::{self, ClientConfig};
use relaychat::{Server, ServerConfig, DEFAULT_BACKLOG_REPLAY};

/// A chat server that replays a shared message log to every client, and a client for it.
#[derive(Parser, Debug)]
#[command(name = "relaychat", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Accept chat clients on PORT.
    Serve {
        /// The port to listen on.
        port: u16,
        /// The address to listen on.
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
        /// How many earlier messages a newly joined client is sent.
        #[arg(long, default_value_t = DEFAULT_BACKLOG_REPLAY)]
        backlog: usize,
    },
    /// Chat from this terminal. Giving a PASSWORD selects the binary protocol.
    Connect {
        /// The server's hostname or IP.
        address: String,
        /// The server's port.
        port: u16,
        /// The name to chat as.
        username: String,
        /// Log in with the binary protocol.
        password: Option<String>,
    },
}

impl Cmd {
    fn default_log_filter(&self) -> &'static str {
        match self {
            Cmd::Serve { .. } => "info",
            Cmd::Connect { .. } => "warn",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.command.default_log_filter()))
        .init();

    match cli.command {
        Cmd::Serve {
            port,
            bind,
            backlog,
        } => {
            let config = ServerConfig {
                listen: SocketAddr::new(bind, port),
                backlog_replay: backlog,
            };
            let server = Server::bind(config.clone())
                .await
                .with_context(|| format!("failed to bind {}", config.listen))?;
            server.run().await.context("server stopped")?;
        }
        Cmd::Connect {
            address,
            port,
            username,
            password,
        } => {
            let config = ClientConfig {
                address,
                port,
                username,
                password,
            };
            client::run(config.clone())
                .await
                .with_context(|| format!("chat with {}:{} ended", config.address, config.port))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["relaychat", "serve", "4000"]);
        match cli.command {
            Cmd::Serve {
                port,
                bind,
                backlog,
            } => {
                assert_eq!(port, 4000);
                assert!(bind.is_unspecified());
                assert_eq!(backlog, DEFAULT_BACKLOG_REPLAY);
            }
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn password_selects_binary_login() {
        let cli = Cli::parse_from(["relaychat", "connect", "localhost", "4000", "bob", "pass"]);
        match cli.command {
            Cmd::Connect { password, .. } => assert_eq!(password.as_deref(), Some("pass")),
            other => panic!("parsed {:?}", other),
        }

        let cli = Cli::parse_from(["relaychat", "connect", "localhost", "4000", "alice"]);
        match cli.command {
            Cmd::Connect { password, .. } => assert_eq!(password, None),
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["relaychat", "serve", "not-a-port"]).is_err());
        assert!(Cli::try_parse_from(["relaychat", "connect", "localhost"]).is_err());
        assert!(Cli::try_parse_from(["relaychat"]).is_err());
    }
}
