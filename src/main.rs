//! Fleetwatch daemon: polls every configured cluster for its game
//! server builds and serves the aggregated fleet view as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use fleetwatch::adapters::http::HttpBuildSource;
use fleetwatch::adapters::BuildSource;
use fleetwatch::config::Config;
use fleetwatch::discovery::poller::{self, PollScheduler};
use fleetwatch::fleet::FleetHandle;
use fleetwatch::server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cluster config (JSON, or YAML by extension)
    #[arg(long, default_value = "clusters.json")]
    config: PathBuf,
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
    /// Overrides `pollIntervalMs` from the config file
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Overrides `requestTimeoutMs` from the config file
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Poll every cluster once, print the snapshot and exit
    #[arg(long)]
    once: bool,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("🛰️ Fleetwatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(ms) = args.interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.request_timeout_ms = ms;
    }
    config.validate().context("Invalid config after CLI overrides")?;

    let source: Arc<dyn BuildSource> = Arc::new(HttpBuildSource::with_listing_path(
        config.request_timeout(),
        config.build_path.clone(),
    ));
    let fleet = FleetHandle::new();

    if args.once {
        poller::run_full_scan(&config.clusters, source, &fleet).await;
        let snapshot = fleet.snapshot();
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        return Ok(());
    }

    let mut scheduler = PollScheduler::new(&config, source, fleet.clone());
    scheduler.activate();

    tokio::select! {
        res = server::serve(args.bind, fleet) => {
            res.context("Dashboard feed failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    scheduler.deactivate();
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fleetwatch=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
