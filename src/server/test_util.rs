//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use rstest::fixture;

use super::{Bound, RelayConfig, RelayServer};

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

/// Extract the bound address from a listener.
#[must_use]
pub fn listener_addr(listener: &StdTcpListener) -> SocketAddr {
    listener
        .local_addr()
        .expect("failed to get listener address")
}

/// Build a relay on two fresh loopback listeners.
///
/// Must be called from within a Tokio runtime.
pub fn bind_server(config: RelayConfig) -> RelayServer<Bound> {
    RelayServer::new(config)
        .bind_existing_listeners(free_listener(), free_listener())
        .expect("Failed to bind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_listener_uses_localhost() {
        let addr = listener_addr(&free_listener());
        assert_eq!(addr.ip(), std::net::IpAddr::from(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn bound_server_listens_on_distinct_ports() {
        let server = bind_server(RelayConfig::default());
        assert_ne!(
            server.ingress_addr().expect("ingress addr"),
            server.egress_addr().expect("egress addr")
        );
    }
}
