//! Reach Probe: periodically check whether monitored servers and their services are reachable.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use reach_probe::monitor::DEFAULT_INTERVAL_SECS;
use reach_probe::probe::DEFAULT_TIMEOUT_MS;
use reach_probe::target::DEFAULT_ASSET_PATH;
use reach_probe::{
    JsonSink, LogSink, Monitor, ReachabilityProbe, ServiceRule, StatusSink, TargetRegistry,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    /// Log lines
    Text,
    /// One JSON object per line on stdout (logs go to stderr)
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "reach-probe",
    about = "Check whether servers' web UIs and service ports are reachable",
    long_about = "Loads a static asset from each server's web UI and, when a port is given, sends a request to the service port. Reports Online / Degraded / Offline per server, once or on an interval."
)]
struct Cli {
    /// Server to monitor as ID=HOST[:PORT] (PORT is the service port) or
    /// ID=URL (web UI checked by loading exactly URL, no service port).
    /// Multiple or comma-separated, e.g. --target pihole=192.168.0.175:53
    #[arg(long = "target", short = 't', value_delimiter(','), num_args = 1.., required = true)]
    pub targets: Vec<String>,

    /// Run once: check every server once, then exit (no loop)
    #[arg(long, short = '1', alias = "single")]
    pub once: bool,

    /// Check interval in seconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// Static asset path loaded from each ID=HOST web UI
    #[arg(long, default_value = DEFAULT_ASSET_PATH)]
    pub asset_path: String,

    /// Display label for a server as ID=TEXT, e.g. --label "pihole=Pi-hole DNS"
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// How service status is decided
    #[arg(long, value_enum, default_value_t = ServiceRule::Probe)]
    pub service_rule: ServiceRule,

    /// Output format
    #[arg(long, value_enum, default_value_t = Output::Text)]
    pub output: Output,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((id, text)) if !id.trim().is_empty() && !text.trim().is_empty() => {
            Ok((id.trim().to_string(), text.trim().to_string()))
        }
        _ => Err(format!("expected ID=TEXT, got {:?}", s)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = || {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };
    match cli.output {
        Output::Text => tracing_subscriber::fmt().with_env_filter(filter()).init(),
        Output::Json => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init(),
    }

    let mut registry =
        TargetRegistry::from_specs(&cli.targets, &cli.asset_path).context("Invalid --target")?;
    for (id, text) in &cli.labels {
        registry
            .set_label(id, text.as_str())
            .context("Invalid --label")?;
    }
    let probe = ReachabilityProbe::http().context("Failed to build HTTP client")?;

    tracing::info!(
        "Reach Probe started, {} server(s), service rule: {:?}, mode: {}",
        registry.len(),
        cli.service_rule,
        if cli.once { "single run" } else { "loop" }
    );
    if !cli.once {
        tracing::info!("Checking servers every {} s", cli.interval);
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; stopping...");
            on_signal.cancel();
        }
    });

    let sink: Box<dyn StatusSink> = match cli.output {
        Output::Text => Box::new(LogSink),
        Output::Json => Box::new(JsonSink::new(std::io::stdout())),
    };

    let monitor = Monitor::new(
        probe,
        registry,
        Duration::from_millis(cli.timeout_ms),
        cli.service_rule,
    );
    monitor
        .run(
            sink.as_ref(),
            Duration::from_secs(cli.interval),
            cli.once,
            shutdown,
        )
        .await;

    Ok(())
}
