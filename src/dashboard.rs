//! Per-gateway dashboard provisioning files

use crate::config::{GatewayConfig, GatewaysFile, Settings};
use crate::errors::{MonitorError, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Dashboard template shipped with the binary
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/gateway_dashboard.json");

const NAME_PLACEHOLDER: &str = "{{gateway_name}}";
// gateway name as the body of a PromQL string literal
const LABEL_PLACEHOLDER: &str = "{{gateway_label}}";
const UID_PLACEHOLDER: &str = "{{dashboard_uid}}";
const LATITUDE_PLACEHOLDER: &str = "{{latitude}}";
const LONGITUDE_PLACEHOLDER: &str = "{{longitude}}";

/// Fills the dashboard template for each gateway and writes the result
#[derive(Debug, Clone)]
pub struct DashboardRenderer {
    template: String,
    output_dir: PathBuf,
}

impl DashboardRenderer {
    pub fn new(template: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_builtin_template(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(BUILTIN_TEMPLATE, output_dir)
    }

    /// Build a renderer from settings, reading a custom template if one is configured
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        match &settings.dashboard_template {
            Some(path) => {
                let template = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| MonitorError::render(path, e))?;
                debug!("Using dashboard template {}", path.display());
                Ok(Self::new(template, &settings.dashboard_dir))
            }
            None => Ok(Self::with_builtin_template(&settings.dashboard_dir)),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the dashboard for `gateway` is written
    pub fn dashboard_path(&self, gateway: &GatewayConfig) -> PathBuf {
        self.output_dir.join(dashboard_file_name(&gateway.name))
    }

    /// Substitute the gateway into the template and parse the result
    pub fn apply(&self, gateway: &GatewayConfig) -> Result<Value> {
        let name = json_string_body(&gateway.name)?;
        let label = json_string_body(&promql_string_body(&gateway.name))?;

        let filled = self
            .template
            .replace(NAME_PLACEHOLDER, &name)
            .replace(LABEL_PLACEHOLDER, &label)
            .replace(UID_PLACEHOLDER, &dashboard_uid(&gateway.name))
            .replace(LATITUDE_PLACEHOLDER, &gateway.location.latitude.to_string())
            .replace(LONGITUDE_PLACEHOLDER, &gateway.location.longitude.to_string());

        serde_json::from_str(&filled).map_err(|e| {
            MonitorError::render(
                self.dashboard_path(gateway),
                format!("template did not produce valid JSON: {}", e),
            )
        })
    }

    /// Write the dashboard for one gateway, returning its path
    pub async fn render(&self, gateway: &GatewayConfig) -> Result<PathBuf> {
        let path = self.dashboard_path(gateway);
        let dashboard = self.apply(gateway)?;
        let content = serde_json::to_string_pretty(&dashboard)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| MonitorError::render(&self.output_dir, e))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| MonitorError::render(&path, e))?;

        debug!("Wrote dashboard for gateway {} to {}", gateway.name, path.display());
        Ok(path)
    }

    /// Write one dashboard per configured gateway.
    ///
    /// Two gateways resolving to the same file is a render error, so no
    /// dashboard is silently replaced by another.
    pub async fn render_all(&self, gateways: &GatewaysFile) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::with_capacity(gateways.gateways.len());
        for gateway in &gateways.gateways {
            let path = self.dashboard_path(gateway);
            if !seen.insert(path.clone()) {
                return Err(MonitorError::render(
                    path,
                    format!("gateway name {:?} is configured more than once", gateway.name),
                ));
            }
        }

        let mut written = Vec::with_capacity(gateways.gateways.len());
        for gateway in &gateways.gateways {
            written.push(self.render(gateway).await?);
        }

        info!(
            "Rendered {} gateway dashboards into {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }
}

/// File-name-safe form of a gateway name
pub fn dashboard_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "gateway".to_string()
    } else {
        slug.to_string()
    }
}

/// Dashboard file name: the readable slug plus a digest of the exact name,
/// so names that slug alike (`GW1`/`gw1`, non-ASCII names) stay apart
pub fn dashboard_file_name(name: &str) -> String {
    let uid = dashboard_uid(name);
    format!("{}-{}.json", dashboard_slug(name), &uid[..8])
}

/// Escape `raw` for use inside a double-quoted PromQL string
fn promql_string_body(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `raw` encoded as the contents of a JSON string, without the quotes
fn json_string_body(raw: &str) -> Result<String> {
    let quoted = serde_json::to_string(raw)?;
    Ok(quoted[1..quoted.len() - 1].to_string())
}

/// Stable dashboard uid, identical across restarts for the same gateway name
pub fn dashboard_uid(name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
