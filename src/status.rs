//! Per-server status derived from probe results

use std::fmt;

use serde::Serialize;

use crate::result::ProbeResult;

/// How the service status of an entry is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ServiceRule {
    /// Probe the service port directly
    #[default]
    Probe,
    /// Assume the service runs whenever the web UI loads.
    ///
    /// Heuristic: a live UI with a dead service reads as running, and a
    /// broken UI hides a working service.
    #[value(name = "infer")]
    InferFromHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    LikelyRunning,
    NotRunning,
    Unknown,
}

impl ServiceStatus {
    pub fn is_up(self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::LikelyRunning)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Running => "Running",
            ServiceStatus::LikelyRunning => "Likely Running",
            ServiceStatus::NotRunning => "Not Running",
            ServiceStatus::Unknown => "Unknown",
        })
    }
}

/// Overall server state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Host up and service up (or not monitored)
    Online,
    /// Host up, probed service down
    Degraded,
    /// Host down
    Offline,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Health::Online => "Online",
            Health::Degraded => "Degraded",
            Health::Offline => "Offline",
        })
    }
}

/// Derived state of one registry entry after a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub health: Health,
    pub service_status: ServiceStatus,
    pub web: ProbeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ProbeResult>,
}

impl ServerStatus {
    pub fn derive(
        id: impl Into<String>,
        rule: ServiceRule,
        web: ProbeResult,
        service: Option<ProbeResult>,
    ) -> Self {
        let service_status = match (rule, &service) {
            (ServiceRule::InferFromHost, _) if web.reachable => ServiceStatus::LikelyRunning,
            (ServiceRule::InferFromHost, _) => ServiceStatus::NotRunning,
            (ServiceRule::Probe, Some(r)) if r.reachable => ServiceStatus::Running,
            (ServiceRule::Probe, Some(_)) => ServiceStatus::NotRunning,
            (ServiceRule::Probe, None) => ServiceStatus::Unknown,
        };
        let health = if !web.reachable {
            Health::Offline
        } else if service_status == ServiceStatus::NotRunning {
            Health::Degraded
        } else {
            Health::Online
        };
        Self {
            id: id.into(),
            label: None,
            health,
            service_status,
            web,
            service,
        }
    }

    pub fn with_label(mut self, label: Option<&str>) -> Self {
        self.label = label.map(str::to_string);
        self
    }

    /// Label when set, id otherwise
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}
