//! Gauge registry exported to Prometheus

use crate::errors::{MonitorError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Owns every exported series.
///
/// Cloning is cheap and all clones share the same underlying collectors, so
/// the monitor loop and the scrape handler can each hold one. Individual
/// gauges are atomic; a scrape never sees a half-written value.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    link_status: GaugeVec,
    location: GaugeVec,
    last_update: GaugeVec,
    last_update_seconds: GaugeVec,
    cycles_total: IntCounter,
    cycle_duration: Gauge,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let link_status = GaugeVec::new(
            Opts::new("gateway_link_status", "Shows link status: 1 for online, 0 for offline"),
            &["gateway_name", "link_url"],
        )?;
        let location = GaugeVec::new(
            Opts::new(
                "gateway_location",
                "Gateway location with latitude and longitude as labels",
            ),
            &["gateway_name", "latitude", "longitude"],
        )?;
        let last_update = GaugeVec::new(
            Opts::new(
                "gateway_last_update_timestamp",
                "Most recent update time reported by a gateway, as a label",
            ),
            &["gateway_name", "last_update"],
        )?;
        let last_update_seconds = GaugeVec::new(
            Opts::new(
                "gateway_last_update_seconds",
                "Most recent update time reported by a gateway, in Unix seconds",
            ),
            &["gateway_name"],
        )?;
        let cycles_total = IntCounter::new(
            "gateway_monitor_cycles_total",
            "Number of completed monitoring cycles",
        )?;
        let cycle_duration = Gauge::new(
            "gateway_monitor_cycle_duration_seconds",
            "Duration of the last monitoring cycle",
        )?;

        registry.register(Box::new(link_status.clone()))?;
        registry.register(Box::new(location.clone()))?;
        registry.register(Box::new(last_update.clone()))?;
        registry.register(Box::new(last_update_seconds.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;

        Ok(Self {
            registry,
            link_status,
            location,
            last_update,
            last_update_seconds,
            cycles_total,
            cycle_duration,
        })
    }

    pub fn set_link_status(&self, gateway_name: &str, url: &str, online: bool) {
        let value = if online { 1.0 } else { 0.0 };
        self.link_status
            .with_label_values(&[gateway_name, url])
            .set(value);
    }

    pub fn set_location(&self, gateway_name: &str, latitude: f64, longitude: f64) {
        let latitude = format!("{:.6}", latitude);
        let longitude = format!("{:.6}", longitude);
        self.location
            .with_label_values(&[gateway_name, &latitude, &longitude])
            .set(1.0);
    }

    pub fn set_last_update(&self, gateway_name: &str, timestamp: DateTime<Utc>) {
        let label = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.last_update
            .with_label_values(&[gateway_name, &label])
            .set(1.0);
        self.last_update_seconds
            .with_label_values(&[gateway_name])
            .set(timestamp.timestamp() as f64);
    }

    pub fn record_cycle(&self, elapsed: Duration) {
        self.cycles_total.inc();
        self.cycle_duration.set(elapsed.as_secs_f64());
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render the current snapshot in the text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| MonitorError::Metrics(prometheus::Error::Msg(e.to_string())))
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
