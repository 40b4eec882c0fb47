//! Gateway monitor binary

use clap::Parser;
use gateway_monitor::{
    config, server, DashboardRenderer, GatewayMetrics, GatewayMonitor, HttpLinkFetcher, Result,
    Settings,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    initialize_tracing();

    info!("Starting gateway monitor v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::parse();

    if let Err(e) = settings.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Monitor configuration - Gateways: {}, Interval: {:?}, Timeout: {:?}, Concurrency: {}, Dashboards: {}",
        settings.gateways_file.display(),
        settings.fetch_interval(),
        settings.fetch_timeout(),
        settings.fetch_concurrency,
        settings.dashboard_dir.display()
    );

    let metrics = match prepare(&settings).await {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    server::serve(settings.listen_socket()?, metrics).await
}

/// Load gateways, provision dashboards and start the monitor loop
async fn prepare(settings: &Settings) -> Result<GatewayMetrics> {
    let gateways = Arc::new(config::load(&settings.gateways_file)?);
    info!(
        "Loaded {} gateways with {} links",
        gateways.gateways.len(),
        gateways.link_count()
    );

    let renderer = DashboardRenderer::from_settings(settings).await?;
    renderer.render_all(&gateways).await?;

    let metrics = GatewayMetrics::new()?;
    let fetcher = Arc::new(HttpLinkFetcher::new(settings.fetch_timeout())?);

    GatewayMonitor::new(
        gateways,
        fetcher,
        metrics.clone(),
        settings.fetch_interval(),
        settings.fetch_concurrency,
    )
    .spawn();

    Ok(metrics)
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
