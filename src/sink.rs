//! Status sinks: where probe results end up

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::result::ProbeResult;
use crate::status::{Health, ServerStatus};

/// Consumer of probe results, keyed by target id.
///
/// Results arrive in completion order, not registry order.
pub trait StatusSink: Send + Sync {
    fn report(&self, target_id: &str, result: &ProbeResult);

    /// Called once per entry after both of its probes resolved
    fn report_server(&self, _status: &ServerStatus) {}
}

/// Writes results as tracing events
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, target_id: &str, result: &ProbeResult) {
        if result.reachable {
            tracing::info!("{}: Online ({} ms)", target_id, result.elapsed_ms);
        } else {
            tracing::info!("{}: Offline ({})", target_id, result.kind);
        }
    }

    fn report_server(&self, status: &ServerStatus) {
        match status.health {
            Health::Online => tracing::info!(
                "{}: {}, service {}",
                status.display_name(),
                status.health,
                status.service_status
            ),
            Health::Degraded | Health::Offline => tracing::warn!(
                "{}: {}, service {}",
                status.display_name(),
                status.health,
                status.service_status
            ),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Line<'a> {
    Probe {
        target: &'a str,
        #[serde(flatten)]
        result: &'a ProbeResult,
    },
    Server(&'a ServerStatus),
}

/// Writes one JSON object per line
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, line: &Line<'_>) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let written = serde_json::to_writer(&mut *out, line)
            .map_err(std::io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            tracing::warn!("Failed to write status line: {}", e);
        }
    }
}

impl<W: Write + Send> StatusSink for JsonSink<W> {
    fn report(&self, target_id: &str, result: &ProbeResult) {
        self.emit(&Line::Probe {
            target: target_id,
            result,
        });
    }

    fn report_server(&self, status: &ServerStatus) {
        self.emit(&Line::Server(status));
    }
}
