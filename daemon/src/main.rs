//! Merit daemon: entry point for running a merit node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use merit_network::{HttpPeerClient, PeerClient};
use merit_node::{init_logging, LogFormat, MeritNode, NodeConfig, StartOutcome};
use merit_rpc::RpcServer;
use merit_work::Difficulty;

#[derive(Parser)]
#[command(name = "merit-daemon", about = "Merit ledger node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "MERIT_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port to listen on.
    #[arg(long, env = "MERIT_PORT")]
    port: Option<u16>,

    /// Numeric node id; the centre of this node's peer ring.
    #[arg(long, env = "MERIT_NODE_ID")]
    id: Option<i32>,

    /// Address peers should use to reach this node.
    #[arg(long, env = "MERIT_ADVERTISE_ADDR")]
    advertise_addr: Option<String>,

    /// Peer to download the chain from on start (e.g. "http://localhost:6686").
    #[arg(long, env = "MERIT_BOOTSTRAP")]
    bootstrap: Option<String>,

    /// Proof-of-work prefix of hex zeros, e.g. "00000".
    #[arg(long, env = "MERIT_DIFFICULTY")]
    difficulty: Option<Difficulty>,

    /// Maximum size of the peer directory.
    #[arg(long, env = "MERIT_MAX_PEERS")]
    max_peers: Option<usize>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MERIT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MERIT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Wait for GET /start instead of starting immediately.
    #[arg(long, env = "MERIT_NO_AUTOSTART")]
    no_autostart: bool,

    /// Serve and gossip without mining blocks.
    #[arg(long, env = "MERIT_NO_MINING")]
    no_mining: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node (default).
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

impl Cli {
    /// File settings (or defaults) with every given flag applied on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_str().context("config path is not valid UTF-8")?;
                NodeConfig::from_toml_file(path)
                    .with_context(|| format!("loading config from {path}"))?
            }
            None => NodeConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(id) = self.id {
            config.node_id = id;
        }
        if let Some(addr) = &self.advertise_addr {
            config.advertise_addr = Some(addr.clone());
        }
        if let Some(peer) = &self.bootstrap {
            config.bootstrap_peer = Some(peer.clone());
        }
        if let Some(difficulty) = &self.difficulty {
            config.difficulty = difficulty.clone();
        }
        if let Some(max_peers) = self.max_peers {
            config.max_peers = max_peers;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if self.no_mining {
            config.enable_mining = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    if let Some(Command::PrintConfig) = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    tracing::info!(
        id = config.node_id,
        port = config.port,
        difficulty = %config.difficulty,
        mining = config.enable_mining,
        "starting merit node"
    );
    if let Some(peer) = &config.bootstrap_peer {
        tracing::info!(peer = %peer, "bootstrap peer configured");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let client = Arc::new(HttpPeerClient::new(config.peer_timeout()));
    let node = MeritNode::new(config, client as Arc<dyn PeerClient>)?;
    let server = RpcServer::new(Arc::clone(&node));

    // Bind before starting so the bootstrap peer can reach us back.
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    if !cli.no_autostart {
        match node.start().await.context("node bring-up failed")? {
            StartOutcome::Started => tracing::info!("node running"),
            StartOutcome::AlreadyRunning => {}
        }
    } else {
        tracing::info!("autostart disabled, waiting for GET /start");
    }

    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received, stopping");
        })
        .await?;

    tracing::info!("merit daemon exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "merit-daemon",
            "--port",
            "7001",
            "--id",
            "4",
            "--bootstrap",
            "http://localhost:6686",
            "--difficulty",
            "000",
            "--no-mining",
        ]);
        let config = cli.node_config().unwrap();
        assert_eq!(config.port, 7001);
        assert_eq!(config.node_id, 4);
        assert_eq!(config.bootstrap_peer.as_deref(), Some("http://localhost:6686"));
        assert_eq!(config.difficulty.len(), 3);
        assert!(!config.enable_mining);
        assert_eq!(config.self_addr(), "http://localhost:7001");
    }

    #[test]
    fn bad_difficulty_is_refused() {
        assert!(Cli::try_parse_from(["merit-daemon", "--difficulty", "0x0"]).is_err());
    }

    #[test]
    fn print_config_subcommand() {
        let cli = Cli::parse_from(["merit-daemon", "print-config"]);
        assert!(matches!(cli.command, Some(Command::PrintConfig)));
        assert!(!cli.no_autostart);
    }
}
