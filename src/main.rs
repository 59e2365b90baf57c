//! `ctmp_relay` binary.
//!
//! Parses the command line, binds both listeners and runs the relay until
//! Ctrl+C. Exits with status 1 if either listener cannot be bound.

mod cli;

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use ctmp_relay::server::{RelayConfig, RelayServer};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn relay_config(cli: &cli::Cli) -> RelayConfig {
    RelayConfig {
        bind_ip: cli.bind,
        ingress_port: cli.ingress_port,
        egress_port: cli.egress_port,
        ingress_backlog: cli.ingress_backlog,
        egress_backlog: cli.egress_backlog,
        send_timeout: cli.send_timeout_ms.map(Duration::from_millis),
        ..RelayConfig::default()
    }
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &cli::Cli) -> Result<(), metrics_exporter_prometheus::BuildError> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving prometheus metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &cli::Cli) -> Result<(), std::convert::Infallible> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature; ignoring --metrics-addr");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    if let Err(e) = install_metrics(&cli) {
        error!(error = %e, "failed to install metrics exporter");
        return ExitCode::FAILURE;
    }

    let server = match RelayServer::new(relay_config(&cli)).bind() {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "relay setup failed");
            return ExitCode::FAILURE;
        }
    };
    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "relay stopped with an error");
            ExitCode::FAILURE
        }
    }
}
