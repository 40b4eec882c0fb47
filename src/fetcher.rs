//! Fetching and tolerant parsing of gateway status links

use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Liveness observed for one link during one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkObservation {
    pub online: bool,
    pub observed_at: Option<DateTime<Utc>>,
}

impl LinkObservation {
    pub fn offline() -> Self {
        Self {
            online: false,
            observed_at: None,
        }
    }
}

/// Source of link observations used by the monitor loop.
///
/// Implementations never fail: anything that prevents a definite answer is
/// reported as an offline observation.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn fetch(&self, gateway_name: &str, url: &str) -> LinkObservation;
}

/// Reasons a link could not produce a positive status
#[derive(Debug)]
pub enum FetchFailure {
    Transport(reqwest::Error),
    Timeout,
    Status(StatusCode),
    Body(serde_json::Error),
    NotAnObject,
    MissingStatus,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Transport(err) => write!(f, "transport error: {}", err),
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::Status(status) => write!(f, "non-success response: {}", status),
            FetchFailure::Body(err) => write!(f, "malformed JSON body: {}", err),
            FetchFailure::NotAnObject => write!(f, "JSON body is not an object"),
            FetchFailure::MissingStatus => write!(f, "no 'online' status found"),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// HTTP implementation of [`LinkProbe`]
#[derive(Debug, Clone)]
pub struct HttpLinkFetcher {
    client: Client,
}

impl HttpLinkFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("gateway_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client })
    }

    /// Single GET against `url`, interpreted for `gateway_name`
    pub async fn try_fetch(
        &self,
        gateway_name: &str,
        url: &str,
    ) -> std::result::Result<LinkObservation, FetchFailure> {
        debug!("Fetching status for gateway {} from {}", gateway_name, url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Transport(e)
            }
        })?;

        let document: Value = serde_json::from_slice(&body).map_err(FetchFailure::Body)?;

        extract_observation(&document, gateway_name)
    }
}

#[async_trait]
impl LinkProbe for HttpLinkFetcher {
    async fn fetch(&self, gateway_name: &str, url: &str) -> LinkObservation {
        match self.try_fetch(gateway_name, url).await {
            Ok(observation) => observation,
            Err(failure) => {
                warn!(
                    "Marking link {} of gateway {} offline: {}",
                    url, gateway_name, failure
                );
                LinkObservation::offline()
            }
        }
    }
}

type StatusMatcher = fn(&Map<String, Value>, &str) -> Option<LinkObservation>;

/// Tried in order; the first matcher that recognises a status wins.
const STATUS_MATCHERS: &[StatusMatcher] = &[top_level_status, gateway_keyed_status];

/// Locate the online flag (and optional update time) in a status document.
pub fn extract_observation(
    document: &Value,
    gateway_name: &str,
) -> std::result::Result<LinkObservation, FetchFailure> {
    let fields = document.as_object().ok_or(FetchFailure::NotAnObject)?;

    STATUS_MATCHERS
        .iter()
        .find_map(|matcher| matcher(fields, gateway_name))
        .ok_or(FetchFailure::MissingStatus)
}

// {"online": true, "updatedAt": "..."}
fn top_level_status(fields: &Map<String, Value>, _gateway_name: &str) -> Option<LinkObservation> {
    let online = fields.get("online")?.as_bool()?;

    Some(LinkObservation {
        online,
        observed_at: updated_at(fields),
    })
}

// {"<gateway name>": {"online": true, "updatedAt": "..."}}
fn gateway_keyed_status(fields: &Map<String, Value>, gateway_name: &str) -> Option<LinkObservation> {
    let nested = fields.get(gateway_name)?.as_object()?;
    let online = nested.get("online")?.as_bool()?;

    Some(LinkObservation {
        online,
        observed_at: updated_at(nested).or_else(|| updated_at(fields)),
    })
}

fn updated_at(fields: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let raw = fields.get("updatedAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}
