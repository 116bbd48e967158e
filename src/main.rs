//! mini-deployer
//!
//! Runs configured shell commands in response to authorized webhook calls.
//!
//! # Architecture Overview
//!
//! ```text
//!     Webhook call        ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ net ──▶ http ──▶ security ──▶ exec          │
//!                         │  listener  router   authorizer   sh -c        │
//!     Command output      │                                   │           │
//!     ◀───────────────────┼──────── response ◀────────────────┘           │
//!                         │                                              │
//!                         │  config (ArcSwap snapshot, mtime watcher)    │
//!                         │  lifecycle (signals, reload, restart loop)   │
//!                         │  observability (tracing, metrics)            │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use mini_deployer::config::ConfigStore;
use mini_deployer::http::DeployerServer;
use mini_deployer::lifecycle::{signals, Shutdown};
use mini_deployer::net::parse_listen_addr;
use mini_deployer::observability::{logging, metrics};
use mini_deployer::security::jwt;

#[derive(Parser)]
#[command(name = "mini-deployer", version)]
#[command(about = "Run shell commands from authorized webhook calls", long_about = None)]
struct Cli {
    /// Address to listen on; a bare `:port` listens on all interfaces.
    #[arg(long, default_value = ":7654")]
    listen: String,

    /// Path to the JSON config file.
    #[arg(long, default_value = "/etc/mini-deployer.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a signed claim token accepted by this config
    IssueToken {
        /// Value of the configured claim
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let store = Arc::new(ConfigStore::open(&cli.config)?);
    let config = store.snapshot();

    if let Some(Commands::IssueToken { value }) = cli.command {
        if config.jwt_hmac.is_empty() || config.jwt_claim.is_empty() {
            return Err("jwt_hmac and jwt_claim must both be configured to issue tokens".into());
        }
        let iat = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = jwt::claim_payload(&config.jwt_claim, &value, iat);
        println!("{}", jwt::issue(&claims, config.jwt_hmac.as_bytes()));
        return Ok(());
    }

    let _log_guard = logging::init(config.log_path().as_deref())?;
    tracing::info!(config = %cli.config.display(), "mini-deployer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        routes = config.commands.len(),
        timeout_secs = config.timeout,
        autoreload = !config.disable_autoreload,
        "Configuration loaded"
    );

    if let Some(address) = &config.metrics_address {
        let addr = address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listen = parse_listen_addr(&cli.listen)?;
    let shutdown = Shutdown::new();
    let server = DeployerServer::new(store, shutdown, listen);

    tokio::spawn(signals::listen(server.supervisor()));
    server.run().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
