//! Command line interface for the `ctmp_relay` binary.
//!
//! Every flag can also be set through a `CTMP_*` environment variable.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// Command line arguments for the `ctmp_relay` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ctmp_relay",
    version,
    about = "Relay CTMP frames from one upstream producer to every connected consumer"
)]
pub struct Cli {
    /// Address both listeners bind to.
    #[arg(long, env = "CTMP_BIND", default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Port accepting the upstream producer.
    #[arg(long, env = "CTMP_INGRESS_PORT", default_value_t = 33333)]
    pub ingress_port: u16,

    /// Port accepting downstream consumers.
    #[arg(long, env = "CTMP_EGRESS_PORT", default_value_t = 44444)]
    pub egress_port: u16,

    /// Listen backlog for the ingress port.
    #[arg(long, env = "CTMP_INGRESS_BACKLOG", default_value_t = 10)]
    pub ingress_backlog: u32,

    /// Listen backlog for the egress port.
    #[arg(long, env = "CTMP_EGRESS_BACKLOG", default_value_t = 100)]
    pub egress_backlog: u32,

    /// Drop a consumer whose send takes longer than this many milliseconds.
    /// Unset waits indefinitely.
    #[arg(long, env = "CTMP_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: Option<u64>,

    /// Serve Prometheus metrics on this address. Ignored when built without
    /// the `metrics` feature.
    #[arg(long, env = "CTMP_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_match_the_standard_ports() {
        let cli = Cli::parse_from(["ctmp_relay"]);
        assert_eq!(cli.bind.to_string(), "127.0.0.1");
        assert_eq!(cli.ingress_port, 33333);
        assert_eq!(cli.egress_port, 44444);
        assert_eq!(cli.ingress_backlog, 10);
        assert_eq!(cli.egress_backlog, 100);
        assert_eq!(cli.send_timeout_ms, None);
        assert_eq!(cli.metrics_addr, None);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "ctmp_relay",
            "--bind",
            "0.0.0.0",
            "--ingress-port",
            "4000",
            "--egress-port",
            "4001",
            "--send-timeout-ms",
            "250",
            "--metrics-addr",
            "127.0.0.1:9000",
        ]);
        assert!(cli.bind.is_unspecified());
        assert_eq!(cli.ingress_port, 4000);
        assert_eq!(cli.egress_port, 4001);
        assert_eq!(cli.send_timeout_ms, Some(250));
        assert_eq!(cli.metrics_addr.map(|a| a.port()), Some(9000));
    }

    #[test]
    fn rejects_an_invalid_port() {
        assert!(Cli::try_parse_from(["ctmp_relay", "--ingress-port", "70000"]).is_err());
    }
}
