//! Gateway status monitor
//!
//! Polls the status links of configured IoT gateways, publishes the results
//! as Prometheus gauges and provisions one dashboard per gateway.

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fetcher;
pub mod metrics;
pub mod monitor;
pub mod server;

pub use config::{GatewayConfig, GatewaysFile, Settings};
pub use dashboard::DashboardRenderer;
pub use errors::{MonitorError, Result};
pub use fetcher::{HttpLinkFetcher, LinkObservation, LinkProbe};
pub use metrics::GatewayMetrics;
pub use monitor::{CycleReport, GatewayMonitor};
