//! CLI for whisper
//!
//! Subcommands:
//! - `broker <listen-address>`: run the broker
//! - `node <broker-address>`: connect and read `SUB`/`PUB` commands from stdin

use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use whisper::broker::Broker;
use whisper::config::{Settings, load_config};
use whisper::node::{Node, console};
use whisper::transport::Server;
use whisper::utils::{Result, logging};

#[derive(Parser)]
#[command(name = "whisper")]
enum Command {
    /// Start a broker bound to the given address
    Broker {
        /// Address to listen on, e.g. 127.0.0.1:8080
        addr: String,
    },
    /// Connect a node to a broker and read commands from stdin
    Node {
        /// Broker address, e.g. 127.0.0.1:8080
        addr: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.logging.level);

    let result = match cmd {
        Command::Broker { addr } => run_broker(&addr, settings).await,
        Command::Node { addr } => run_node(&addr).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_broker(addr: &str, settings: Settings) -> Result<()> {
    let server = Server::bind(addr, Broker::new(), settings.broker).await?;

    let shutdown = CancellationToken::new();
    let server_task = tokio::spawn(server.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully.");
    shutdown.cancel();

    if let Err(e) = server_task.await {
        error!("Broker task failed: {e}");
    }
    Ok(())
}

async fn run_node(addr: &str) -> Result<()> {
    let node = Node::connect(addr).await?;
    let listener = node.listen();

    console::run(&node, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    // stdin closed; keep printing deliveries until the broker goes away
    if let Some(listener) = listener {
        tokio::select! {
            _ = listener => info!("Broker connection closed"),
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received."),
        }
    }
    Ok(())
}
