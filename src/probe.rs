//! Reachability probes.
//!
//! Every probe makes exactly one attempt and always resolves to a
//! [`ProbeResult`]. Transport failures, non-2xx responses and bad targets
//! are all folded into [`ProbeOutcome::NetworkError`]; running out of time is
//! [`ProbeOutcome::Timeout`]. Nothing is retried.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::result::{ProbeOutcome, ProbeResult};
use crate::target::{ProbeKind, Target};
use crate::transport::{FetchMode, HttpTransport, ProbeRequest, Transport, TransportError};

/// Default probe timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

pub struct ReachabilityProbe<T = HttpTransport> {
    transport: T,
}

impl ReachabilityProbe<HttpTransport> {
    /// Probe backed by a fresh reqwest client
    pub fn http() -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new()?))
    }
}

impl<T: Transport> ReachabilityProbe<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch a known static asset on the target.
    ///
    /// Reachable only when the asset loads completely with a 2xx status
    /// before `timeout`. A down host, a missing asset and a refused response
    /// all look the same from here.
    pub async fn probe_via_passive_resource(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let request = ProbeRequest {
            url: target.asset_url(),
            mode: FetchMode::Passive,
        };
        self.attempt(target, request, timeout).await
    }

    /// Send a request to `host:port` and classify the HTTP status.
    ///
    /// A target without a port cannot be probed this way and resolves as
    /// [`ProbeOutcome::NetworkError`] without touching the network.
    pub async fn probe_via_active_request(&self, target: &Target, timeout: Duration) -> ProbeResult {
        if target.port().is_none() {
            tracing::debug!("{}: active probe needs a port", target);
            return ProbeResult::network_error(Duration::ZERO);
        }
        let request = ProbeRequest {
            url: target.request_url(),
            mode: FetchMode::Active,
        };
        self.attempt(target, request, timeout).await
    }

    /// Probe using the technique the target was built with
    pub async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        match target.kind() {
            ProbeKind::ImageLoad(_) => self.probe_via_passive_resource(target, timeout).await,
            ProbeKind::HttpRequest => self.probe_via_active_request(target, timeout).await,
        }
    }

    /// Like [`probe`](Self::probe), but gives up as soon as `token` is
    /// cancelled. Returns `None` when aborted; the in-flight request is dropped.
    pub async fn probe_until_cancelled(
        &self,
        target: &Target,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Option<ProbeResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("{}: probe aborted", target);
                None
            }
            result = self.probe(target, timeout) => Some(result),
        }
    }

    async fn attempt(&self, target: &Target, request: ProbeRequest, timeout: Duration) -> ProbeResult {
        if timeout.is_zero() {
            return ProbeResult::timeout(Duration::ZERO);
        }

        let started = Instant::now();
        let kind = match tokio::time::timeout(timeout, self.transport.fetch(&request)).await {
            Ok(Ok(status)) if (200..300).contains(&status) => ProbeOutcome::Success,
            Ok(Ok(status)) => {
                tracing::debug!("{}: {} answered with status {}", target, request.url, status);
                ProbeOutcome::NetworkError
            }
            Ok(Err(TransportError::Timeout)) | Err(_) => {
                tracing::debug!("{}: {} timed out after {:?}", target, request.url, timeout);
                ProbeOutcome::Timeout
            }
            Ok(Err(e)) => {
                tracing::debug!("{}: {} failed: {}", target, request.url, e);
                ProbeOutcome::NetworkError
            }
        };
        ProbeResult::new(kind, started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::AssetLocator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Behavior {
        Respond { after: Duration, status: u16 },
        Fail,
        ReportTimeout,
        Hang,
    }

    struct Scripted {
        behavior: Behavior,
        calls: AtomicUsize,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    impl Scripted {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn fetch(&self, request: &ProbeRequest) -> Result<u16, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            match self.behavior {
                Behavior::Respond { after, status } => {
                    tokio::time::sleep(after).await;
                    Ok(status)
                }
                Behavior::Fail => Err(TransportError::Request("connection refused".into())),
                Behavior::ReportTimeout => Err(TransportError::Timeout),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    fn default_timeout() -> Duration {
        Duration::from_millis(DEFAULT_TIMEOUT_MS)
    }

    #[tokio::test(start_paused = true)]
    async fn fast_success_is_reachable() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::from_millis(50),
            status: 200,
        }));
        let target = Target::image_load("10.0.0.5").unwrap();

        let result = probe.probe_via_passive_resource(&target, default_timeout()).await;

        assert!(result.reachable);
        assert_eq!(result.kind, ProbeOutcome::Success);
        assert!(result.elapsed_ms >= 50);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_host_times_out_after_deadline() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Hang));
        let target = Target::image_load("10.0.0.6").unwrap();

        let started = Instant::now();
        let result = probe.probe_via_passive_resource(&target, default_timeout()).await;

        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert!(!result.reachable);
        assert_eq!(result.kind, ProbeOutcome::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_network_error() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::from_millis(10),
            status: 500,
        }));
        let target = Target::http_request("10.0.0.7", 8080).unwrap();

        let result = probe.probe_via_active_request(&target, default_timeout()).await;

        assert!(!result.reachable);
        assert_eq!(result.kind, ProbeOutcome::NetworkError);
        assert_eq!(probe.transport.seen.lock().unwrap()[0].url, "http://10.0.0.7:8080/");
    }

    #[tokio::test(start_paused = true)]
    async fn response_slower_than_timeout_is_timeout() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::from_secs(6),
            status: 200,
        }));
        let target = Target::image_load("10.0.0.5").unwrap();

        let result = probe.probe_via_passive_resource(&target, default_timeout()).await;

        assert_eq!(result.kind, ProbeOutcome::Timeout);
        assert!(result.elapsed_ms >= 5000);
    }

    #[tokio::test]
    async fn transport_timeout_keeps_its_kind() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::ReportTimeout));
        let target = Target::http_request("10.0.0.7", 8080).unwrap();

        let result = probe.probe_via_active_request(&target, default_timeout()).await;

        assert_eq!(result.kind, ProbeOutcome::Timeout);
    }

    #[tokio::test]
    async fn unreachable_target_stays_unreachable() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Fail));
        let target = Target::image_load("10.0.0.8").unwrap();

        let first = probe.probe_via_passive_resource(&target, default_timeout()).await;
        let second = probe.probe_via_passive_resource(&target, default_timeout()).await;

        assert_eq!(first.kind, ProbeOutcome::NetworkError);
        assert_eq!(second.kind, ProbeOutcome::NetworkError);
        assert!(!first.reachable && !second.reachable);
        assert_eq!(probe.transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn active_probe_without_port_skips_network() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::ZERO,
            status: 200,
        }));
        let target = Target::image_load("10.0.0.5").unwrap();

        let result = probe.probe_via_active_request(&target, default_timeout()).await;

        assert_eq!(result.kind, ProbeOutcome::NetworkError);
        assert_eq!(probe.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_timeout_resolves_as_timeout() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Hang));
        let target = Target::image_load("10.0.0.5").unwrap();

        let result = probe.probe_via_passive_resource(&target, Duration::ZERO).await;

        assert_eq!(result.kind, ProbeOutcome::Timeout);
        assert_eq!(probe.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passive_probe_loads_asset_in_passive_mode() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::ZERO,
            status: 204,
        }));
        let target = Target::new(
            "192.168.0.175",
            None,
            ProbeKind::ImageLoad(AssetLocator::Absolute("http://192.168.0.175/logo.png".into())),
        )
        .unwrap();

        let result = probe.probe(&target, default_timeout()).await;

        assert!(result.reachable);
        let seen = probe.transport.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            ProbeRequest {
                url: "http://192.168.0.175/logo.png".into(),
                mode: FetchMode::Passive,
            }
        );
    }

    #[tokio::test]
    async fn probe_dispatches_http_request_targets_to_active_mode() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Respond {
            after: Duration::ZERO,
            status: 200,
        }));
        let target = Target::http_request("10.0.0.7", 53).unwrap();

        probe.probe(&target, default_timeout()).await;

        assert_eq!(probe.transport.seen.lock().unwrap()[0].mode, FetchMode::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_probe_resolves_to_none() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Hang));
        let target = Target::image_load("10.0.0.6").unwrap();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result = probe.probe_until_cancelled(&target, default_timeout(), &token).await;

        assert!(result.is_none());
        assert!(started.elapsed() < Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn uncancelled_probe_resolves_normally() {
        let probe = ReachabilityProbe::new(Scripted::new(Behavior::Fail));
        let target = Target::image_load("10.0.0.6").unwrap();
        let token = CancellationToken::new();

        let result = probe.probe_until_cancelled(&target, default_timeout(), &token).await;

        assert_eq!(result.map(|r| r.kind), Some(ProbeOutcome::NetworkError));
    }
}
