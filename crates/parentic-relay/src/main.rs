//! Parentic Relay Server
//!
//! Streams completion provider output to the browser as server-sent events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use parentic_core::config::load_config;
use parentic_core::tracing_init::{default_filter, init_tracing};

use parentic_relay::gateway::RequestGateway;
use parentic_relay::server::{AppState, build_router};
use parentic_relay::storage::ChatDatabase;

#[derive(Parser, Debug)]
#[command(name = "parentic-relay")]
#[command(
    version,
    about = "Parentic chat relay - streams completion provider output to the browser"
)]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "PARENTIC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr.to_string();
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if args.log_json {
        config.server.log_json = true;
    }

    init_tracing(
        &default_filter("parentic_relay", &config.server.log_level),
        config.server.log_json,
    );

    let addr: SocketAddr = config.server.addr.parse()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        upstream = %config.upstream.completions_url(),
        model = %config.upstream.model,
        "Starting parentic-relay"
    );

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening chat database");
    let db = ChatDatabase::open(&db_path).await?;

    let gateway = Arc::new(RequestGateway::new(&config, Some(db.clone())));
    if !gateway.is_configured() {
        warn!("Completion provider API key not configured; chat requests will fail");
    }

    let app = build_router(AppState {
        gateway,
        history: Some(db),
        relay: config.relay.clone(),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Relay server listening");

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Relay stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".parentic").join("relay.db"))
}
