//! Probe every registry entry and report derived status

use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::probe::ReachabilityProbe;
use crate::registry::{RegistryEntry, TargetRegistry};
use crate::sink::StatusSink;
use crate::status::{Health, ServerStatus, ServiceRule};
use crate::transport::{HttpTransport, Transport};

/// Default pause between passes in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 7;

pub struct Monitor<T = HttpTransport> {
    probe: ReachabilityProbe<T>,
    registry: TargetRegistry,
    timeout: Duration,
    rule: ServiceRule,
}

impl<T: Transport> Monitor<T> {
    pub fn new(
        probe: ReachabilityProbe<T>,
        registry: TargetRegistry,
        timeout: Duration,
        rule: ServiceRule,
    ) -> Self {
        Self {
            probe,
            registry,
            timeout,
            rule,
        }
    }

    /// One pass over the registry. All entries are probed concurrently and
    /// reported as they finish; the returned statuses are in completion order.
    pub async fn check_all(&self, sink: &dyn StatusSink) -> Vec<ServerStatus> {
        let mut pending: FuturesUnordered<_> = self
            .registry
            .entries()
            .iter()
            .map(|entry| self.check_entry(entry, sink))
            .collect();

        let mut statuses = Vec::with_capacity(self.registry.len());
        while let Some(status) = pending.next().await {
            statuses.push(status);
        }
        statuses
    }

    async fn check_entry(&self, entry: &RegistryEntry, sink: &dyn StatusSink) -> ServerStatus {
        let web = async {
            let result = self.probe.probe(entry.web(), self.timeout).await;
            sink.report(&entry.web_id(), &result);
            result
        };
        let service = async {
            match (self.rule, entry.service()) {
                (ServiceRule::Probe, Some(target)) => {
                    let result = self.probe.probe(target, self.timeout).await;
                    sink.report(&entry.service_id(), &result);
                    Some(result)
                }
                _ => None,
            }
        };

        let (web, service) = tokio::join!(web, service);
        let status =
            ServerStatus::derive(entry.id(), self.rule, web, service).with_label(entry.label());
        sink.report_server(&status);
        status
    }

    /// Run passes every `interval` until `shutdown` fires; a single pass if `once`
    pub async fn run(
        &self,
        sink: &dyn StatusSink,
        interval: Duration,
        once: bool,
        shutdown: CancellationToken,
    ) {
        loop {
            tracing::info!("Checking {} server(s)...", self.registry.len());
            tokio::select! {
                statuses = self.check_all(sink) => {
                    let online = statuses
                        .iter()
                        .filter(|s| s.health == Health::Online)
                        .count();
                    tracing::info!("Pass complete: {}/{} online", online, statuses.len());
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, abandoning pass");
                    return;
                }
            }

            if once {
                tracing::info!("--once mode, exiting");
                return;
            }

            tracing::info!("Sleeping {} s...", interval.as_secs());
            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    return;
                }
            }
        }
    }
}
