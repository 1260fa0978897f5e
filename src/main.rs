//! Opinion market gateway entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opinion_gateway::api::{create_router, AppState};
use opinion_gateway::config::Config;
use opinion_gateway::metrics;
use opinion_gateway::upstream::{ListQuery, MarketSource, OpinionClient};

/// Read-only aggregation gateway for the Opinion prediction-market API.
#[derive(Parser, Debug)]
#[command(name = "opinion-gateway")]
#[command(about = "Aggregation gateway over the Opinion prediction-market API")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway (default).
    Run {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Probe the upstream API and print a sample of the payload shape.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("opinion_gateway=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Probe) => cmd_probe().await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// Run the HTTP gateway.
async fn cmd_run(port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load()?;
    if let Err(reason) = config.validate() {
        error!(%reason, "invalid configuration");
        anyhow::bail!("invalid configuration: {reason}");
    }
    if !config.has_api_key() {
        // Startup proceeds so /health and /api/debug stay reachable; every
        // upstream call will fail fast until a credential is configured.
        error!("OPINION_API_KEY is not set; upstream requests will fail");
    }

    metrics::init_metrics();
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| anyhow::anyhow!("failed to install metrics recorder: {err}"))?;

    let client = Arc::new(OpinionClient::new(&config));
    let state = AppState::new(&config, client).with_metrics_handle(metrics_handle);
    let router = create_router(state);

    let port = port.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, api_base = %config.opinion_api_base, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    let config = Config::load()?;
    match config.validate() {
        Ok(()) => {
            println!("configuration OK");
            println!("  api base:       {}", config.opinion_api_base);
            println!("  api key:        {}", if config.has_api_key() { "set" } else { "MISSING" });
            println!("  timeout:        {} ms", config.http_timeout_ms);
            println!("  retry backoff:  {} ms", config.retry_backoff_ms);
            println!("  scan ceiling:   {} pages", config.max_scan_pages);
            println!("  cache capacity: {} entries", config.cache_capacity);
            Ok(())
        }
        Err(reason) => anyhow::bail!("invalid configuration: {reason}"),
    }
}

/// Probe the upstream list endpoint and print the payload shape.
async fn cmd_probe() -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = OpinionClient::new(&config);

    let query = ListQuery {
        page_size: 1,
        ..ListQuery::default()
    };
    match client.fetch_page(&query, 1).await {
        Ok(payload) => {
            let keys: Vec<&str> = payload
                .as_object()
                .map(|obj| obj.keys().take(10).map(String::as_str).collect())
                .unwrap_or_default();
            println!("upstream reachable");
            println!("  payload keys: {keys:?}");
            Ok(())
        }
        Err(err) => anyhow::bail!("upstream probe failed: {err}"),
    }
}

/// Resolve on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
