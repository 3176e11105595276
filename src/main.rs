//! segcast server binary
//!
//! Run with: segcast <config.toml>

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use segcast::catalog::{self, MediaWatcher};
use segcast::scheduler::{RandomSelector, Scheduler, StreamLimits};
use segcast::server::ConnectionMap;
use segcast::{ChannelCatalog, Config, WsServer};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <TOML configuration>", program);
}

#[tokio::main]
async fn main() -> segcast::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        print_usage(args.first().map(String::as_str).unwrap_or("segcast"));
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("segcast=info")),
        )
        .init();

    let config = Config::load(Path::new(&args[1]))?;
    let server_config = config.server();

    let catalog = Arc::new(ChannelCatalog::from_config(&config.channel, &config.channels)?);

    // Watch before scanning so files landing in between are not missed
    let watcher = MediaWatcher::spawn(Arc::clone(&catalog))?;
    let indexed = catalog::scan(&catalog)?;
    tracing::info!(
        channels = catalog.len(),
        segments = indexed,
        "catalog ready"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let server = WsServer::new(server_config.clone());
    let scheduler = Scheduler::new(
        Arc::clone(&catalog),
        ConnectionMap::new(),
        Box::new(RandomSelector),
        StreamLimits::from(&server_config),
    );

    let result = tokio::select! {
        result = server.run_until(events_tx, shutdown_signal()) => result,
        result = scheduler.run(events_rx) => result,
    };

    watcher.abort();
    result
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
