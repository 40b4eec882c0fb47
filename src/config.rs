//! Runtime settings and the gateway configuration file

use crate::errors::{MonitorError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default wait between two monitoring cycles
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Longest accepted wait between two cycles (365 days)
pub const MAX_FETCH_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Process settings, read from command line flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "gateway_monitor", version, about = "Polls IoT gateways and exports their status to Prometheus")]
pub struct Settings {
    /// Path to the gateways configuration file
    #[arg(long, env = "GATEWAYS_FILE", default_value = "config/gateways.json")]
    pub gateways_file: PathBuf,

    /// Minutes between monitoring cycles; invalid or non-positive values fall back to 1
    #[arg(long = "fetch-interval", env = "FETCH_INTERVAL", allow_hyphen_values = true)]
    pub fetch_interval: Option<String>,

    /// Per-link HTTP timeout in seconds
    #[arg(long = "fetch-timeout-secs", env = "FETCH_TIMEOUT_SECONDS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Number of links fetched concurrently within one cycle
    #[arg(long, env = "FETCH_CONCURRENCY", default_value_t = 1)]
    pub fetch_concurrency: usize,

    /// Address the metrics endpoint binds to
    #[arg(long, env = "METRICS_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_addr: String,

    /// Port the metrics endpoint listens on
    #[arg(long, env = "METRICS_PORT", default_value_t = 9100)]
    pub port: u16,

    /// Directory receiving one dashboard file per gateway
    #[arg(long, env = "DASHBOARD_DIR", default_value = "dashboards")]
    pub dashboard_dir: PathBuf,

    /// Optional dashboard template replacing the built-in one
    #[arg(long, env = "DASHBOARD_TEMPLATE")]
    pub dashboard_template: Option<PathBuf>,
}

impl Settings {
    /// Interval between cycles, resolved from the raw `FETCH_INTERVAL` value
    pub fn fetch_interval(&self) -> Duration {
        parse_fetch_interval(self.fetch_interval.as_deref())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn listen_socket(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_addr, self.port)
            .parse()
            .map_err(|e| MonitorError::Settings(format!("invalid listen address {}: {}", self.listen_addr, e)))
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(MonitorError::Settings("fetch timeout must be greater than 0".to_string()));
        }

        if self.fetch_concurrency == 0 {
            return Err(MonitorError::Settings("fetch concurrency must be greater than 0".to_string()));
        }

        self.listen_socket()?;

        Ok(())
    }
}

/// Parse a number of minutes, falling back to the default when the value is
/// absent, not an integer or not positive. Larger values are capped at
/// [`MAX_FETCH_INTERVAL`].
pub fn parse_fetch_interval(raw: Option<&str>) -> Duration {
    raw.map(str::trim)
        .and_then(|value| value.parse::<i128>().ok())
        .filter(|minutes| *minutes > 0)
        .map(|minutes| {
            u64::try_from(minutes)
                .ok()
                .and_then(|minutes| minutes.checked_mul(60))
                .map(Duration::from_secs)
                .map_or(MAX_FETCH_INTERVAL, |interval| interval.min(MAX_FETCH_INTERVAL))
        })
        .unwrap_or(DEFAULT_FETCH_INTERVAL)
}

/// Top-level layout of the gateways file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaysFile {
    pub gateways: Vec<GatewayConfig>,
}

/// One monitored gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub name: String,
    pub location: Location,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A pollable status link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Check {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl GatewaysFile {
    /// Total number of links across all gateways
    pub fn link_count(&self) -> usize {
        self.gateways.iter().map(|gateway| gateway.checks.len()).sum()
    }
}

/// Load the gateway list from a JSON file.
pub fn load(path: impl AsRef<Path>) -> Result<GatewaysFile> {
    let path = path.as_ref();

    let data = std::fs::read_to_string(path).map_err(|e| MonitorError::config(path, e))?;
    let gateways: GatewaysFile = serde_json::from_str(&data).map_err(|e| MonitorError::config(path, e))?;

    for gateway in gateways.gateways.iter().filter(|gateway| gateway.name.is_empty()) {
        warn!(
            "Gateway with {} check(s) has an empty name in {}",
            gateway.checks.len(),
            path.display()
        );
    }

    debug!(
        "Loaded {} gateways with {} links from {}",
        gateways.gateways.len(),
        gateways.link_count(),
        path.display()
    );

    Ok(gateways)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_gateways() {
        let file = write_config(
            r#"{
                "gateways": [
                    {
                        "name": "gw-harbour",
                        "location": { "latitude": 48.4284, "longitude": -123.3656 },
                        "checks": [
                            { "type": "http", "url": "http://gw-harbour.local/status" },
                            { "type": "http", "url": "http://backup.local/gw-harbour" }
                        ]
                    },
                    {
                        "name": "gw-ridge",
                        "location": { "latitude": 49.0, "longitude": -122.5 },
                        "checks": []
                    }
                ]
            }"#,
        );

        let gateways = load(file.path()).unwrap();
        assert_eq!(gateways.gateways.len(), 2);
        assert_eq!(gateways.link_count(), 2);

        let harbour = &gateways.gateways[0];
        assert_eq!(harbour.name, "gw-harbour");
        assert_eq!(harbour.location.latitude, 48.4284);
        assert_eq!(harbour.checks[1].kind, "http");
        assert_eq!(harbour.checks[1].url, "http://backup.local/gw-harbour");
        assert!(gateways.gateways[1].checks.is_empty());
    }

    #[test]
    fn test_missing_fields_are_zero_valued() {
        let file = write_config(r#"{ "gateways": [ { "name": "gw1" } ] }"#);

        let gateways = load(file.path()).unwrap();
        let gateway = &gateways.gateways[0];
        assert_eq!(gateway.location, Location::default());
        assert!(gateway.checks.is_empty());

        let file = write_config("{}");
        assert!(load(file.path()).unwrap().gateways.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("gateways.json")).unwrap_err();
        assert!(matches!(err, MonitorError::Config { .. }));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = write_config("{ \"gateways\": [ ");
        assert!(matches!(load(file.path()), Err(MonitorError::Config { .. })));

        let file = write_config(r#"{ "gateways": { "name": "gw1" } }"#);
        assert!(matches!(load(file.path()), Err(MonitorError::Config { .. })));
    }

    #[test]
    fn test_fetch_interval_parsing() {
        assert_eq!(parse_fetch_interval(None), DEFAULT_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("5")), Duration::from_secs(300));
        assert_eq!(parse_fetch_interval(Some(" 2 ")), Duration::from_secs(120));
        assert_eq!(parse_fetch_interval(Some("0")), DEFAULT_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("-3")), DEFAULT_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("ten")), DEFAULT_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("1440")), Duration::from_secs(86_400));
        assert_eq!(parse_fetch_interval(Some("525600")), MAX_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("525601")), MAX_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("999999999999999999")), MAX_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("9223372036854775807")), MAX_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("99999999999999999999")), MAX_FETCH_INTERVAL);
        assert_eq!(parse_fetch_interval(Some("-99999999999999999999")), DEFAULT_FETCH_INTERVAL);
    }

    #[test]
    fn test_settings_from_args() {
        let settings = Settings::try_parse_from([
            "gateway_monitor",
            "--gateways-file",
            "/etc/gateways.json",
            "--fetch-interval",
            "3",
            "--port",
            "9200",
            "--fetch-concurrency",
            "4",
            "--fetch-timeout-secs",
            "10",
            "--listen-addr",
            "0.0.0.0",
        ])
        .unwrap();

        assert_eq!(settings.gateways_file, PathBuf::from("/etc/gateways.json"));
        assert_eq!(settings.fetch_interval(), Duration::from_secs(180));
        assert_eq!(settings.fetch_concurrency, 4);
        assert_eq!(settings.listen_socket().unwrap().port(), 9200);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let settings = Settings::try_parse_from([
            "gateway_monitor",
            "--fetch-timeout-secs",
            "0",
            "--fetch-concurrency",
            "1",
            "--listen-addr",
            "0.0.0.0",
        ])
        .unwrap();
        assert!(matches!(settings.validate(), Err(MonitorError::Settings(_))));

        let settings = Settings::try_parse_from([
            "gateway_monitor",
            "--fetch-timeout-secs",
            "10",
            "--fetch-concurrency",
            "1",
            "--listen-addr",
            "not an address",
        ])
        .unwrap();
        assert!(matches!(settings.validate(), Err(MonitorError::Settings(_))));
    }
}
