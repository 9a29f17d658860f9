//! Reachability probes for monitored servers and their service ports.

pub mod monitor;
pub mod probe;
pub mod registry;
pub mod result;
pub mod sink;
pub mod status;
pub mod target;
pub mod transport;

pub use monitor::Monitor;
pub use probe::ReachabilityProbe;
pub use registry::{RegistryEntry, TargetRegistry};
pub use result::{ProbeOutcome, ProbeResult};
pub use sink::{JsonSink, LogSink, StatusSink};
pub use status::{Health, ServerStatus, ServiceRule, ServiceStatus};
pub use target::{AssetLocator, ProbeKind, Target};
pub use transport::{HttpTransport, Transport};
