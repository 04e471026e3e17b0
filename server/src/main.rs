//! keyledger license server
//!
//! Issues license keys and validates redemption attempts over HTTP:
//! 1. Issuers create, list, inspect and revoke licenses
//! 2. Clients redeem a key; the peer IP address is the redeeming origin
//!
//! Usage:
//!   keyledger-server --port 8080 --db keyledger.db
//!
//! Licenses are persisted to SQLite unless `--in-memory` is given.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use keyledger_license::DEFAULT_KEY_PREFIX;
use keyledger_registry::{LicenseRegistry, RegistryConfig};
use keyledger_server::build_router;
use keyledger_storage::{InMemoryStore, LicenseStore, SqliteStore};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "keyledger-server")]
#[command(about = "keyledger license issuance and validation server")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "KEYLEDGER_PORT", default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(short, long, env = "KEYLEDGER_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Path to the SQLite license database
    #[arg(long, env = "KEYLEDGER_DB", default_value = "keyledger.db")]
    db: PathBuf,

    /// Keep licenses in memory only (nothing survives a restart)
    #[arg(long)]
    in_memory: bool,

    /// Prefix stamped on generated keys
    #[arg(long, env = "KEYLEDGER_KEY_PREFIX", default_value = DEFAULT_KEY_PREFIX)]
    key_prefix: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("keyledger server starting...");

    let store: Arc<dyn LicenseStore> = if args.in_memory {
        warn!("Using in-memory store; licenses will not survive a restart");
        Arc::new(InMemoryStore::new())
    } else {
        info!("Opening license database at {:?}", args.db);
        let store = SqliteStore::open(&args.db)
            .with_context(|| format!("Failed to open license database {:?}", args.db))?;
        Arc::new(store)
    };
    let licenses = store.len().context("Failed to count stored licenses")?;

    let config = RegistryConfig {
        key_prefix: args.key_prefix,
        ..RegistryConfig::default()
    };
    let registry = LicenseRegistry::new(store, config).context("Invalid registry configuration")?;
    let prefix = registry.config().key_prefix.clone();
    let app = build_router(Arc::new(registry));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", args.bind, args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.bind, args.port))?;
    let local_addr = listener.local_addr().context("Failed to read bound address")?;
    info!("HTTP API listening on {}", local_addr);

    println!("\n========================================");
    println!("  keyledger Server Running");
    println!("========================================");
    println!("  Address:    {}", local_addr);
    println!("  Key prefix: {}", prefix);
    println!("  Licenses:   {}", licenses);
    println!("========================================\n");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    info!("keyledger server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
