//! Periodic polling of every configured gateway link

use crate::config::GatewaysFile;
use crate::fetcher::LinkProbe;
use crate::metrics::GatewayMetrics;

use futures::stream::{self, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

/// Drives fetch cycles and publishes their results
pub struct GatewayMonitor {
    gateways: Arc<GatewaysFile>,
    probe: Arc<dyn LinkProbe>,
    metrics: GatewayMetrics,
    interval: Duration,
    concurrency: usize,
}

/// Outcome of one pass over all gateways
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub gateways: usize,
    pub links_checked: usize,
    pub links_online: usize,
    pub elapsed: Duration,
}

impl GatewayMonitor {
    pub fn new(
        gateways: Arc<GatewaysFile>,
        probe: Arc<dyn LinkProbe>,
        metrics: GatewayMetrics,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            gateways,
            probe,
            metrics,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    /// Start the loop on its own task. It runs until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run cycles forever, waiting one interval after each
    #[instrument(skip(self), fields(interval = ?self.interval, concurrency = self.concurrency))]
    pub async fn run(self) {
        info!(
            "Monitoring {} gateways with {} links",
            self.gateways.gateways.len(),
            self.gateways.link_count()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = self.run_cycle().await;
            info!(
                "Cycle complete - {} gateways, {}/{} links online in {}ms",
                report.gateways,
                report.links_online,
                report.links_checked,
                report.elapsed.as_millis()
            );

            // the wait is measured from the end of the cycle
            ticker.reset();
            debug!("Sleeping for {:?} before next fetch", self.interval);
        }
    }

    /// Fetch every link once and publish the results.
    ///
    /// Gateways and their checks are published in configuration order. Up to
    /// `concurrency` fetches are in flight at once; the method returns only
    /// after every link has been published.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let probe = Arc::clone(&self.probe);

        let links: Vec<(String, String)> = self
            .gateways
            .gateways
            .iter()
            .flat_map(|gateway| {
                gateway
                    .checks
                    .iter()
                    .map(move |check| (gateway.name.clone(), check.url.clone()))
            })
            .collect();

        let mut observations = pin!(
            stream::iter(links)
                .map(move |(gateway_name, url)| {
                    let probe = Arc::clone(&probe);
                    async move { probe.fetch(&gateway_name, &url).await }
                })
                .buffered(self.concurrency)
        );

        let mut report = CycleReport {
            gateways: self.gateways.gateways.len(),
            ..CycleReport::default()
        };

        for gateway in &self.gateways.gateways {
            self.metrics
                .set_location(&gateway.name, gateway.location.latitude, gateway.location.longitude);
            debug!(
                "Updated location for gateway {} ({}, {})",
                gateway.name, gateway.location.latitude, gateway.location.longitude
            );

            for check in &gateway.checks {
                let Some(observation) = observations.next().await else {
                    break;
                };

                report.links_checked += 1;
                if observation.online {
                    report.links_online += 1;
                }

                self.metrics
                    .set_link_status(&gateway.name, &check.url, observation.online);
                if let Some(observed_at) = observation.observed_at {
                    self.metrics.set_last_update(&gateway.name, observed_at);
                }

                debug!(
                    "Updated link status for gateway {}, {} link {}: online={}",
                    gateway.name, check.kind, check.url, observation.online
                );
            }
        }

        report.elapsed = started.elapsed();
        self.metrics.record_cycle(report.elapsed);

        report
    }
}
