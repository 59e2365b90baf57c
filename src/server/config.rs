//! Configuration for [`RelayServer`].

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use tokio::sync::oneshot;

use super::{RelayServer, ServerState, Unbound, runtime::BackoffConfig};
use crate::egress::EgressRegistry;

/// Default port for the upstream producer.
pub const DEFAULT_INGRESS_PORT: u16 = 33333;
/// Default port for downstream consumers.
pub const DEFAULT_EGRESS_PORT: u16 = 44444;
/// Default listen backlog for the ingress port.
pub const DEFAULT_INGRESS_BACKLOG: u32 = 10;
/// Default listen backlog for the egress port.
pub const DEFAULT_EGRESS_BACKLOG: u32 = 100;

/// Addresses, backlogs and timing for a relay.
///
/// # Examples
///
/// ```
/// use ctmp_relay::server::RelayConfig;
///
/// let config = RelayConfig::default();
/// assert_eq!(config.ingress_addr().to_string(), "127.0.0.1:33333");
/// assert_eq!(config.egress_addr().to_string(), "127.0.0.1:44444");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address both listeners bind to.
    pub bind_ip: IpAddr,
    /// Port accepting the upstream producer.
    pub ingress_port: u16,
    /// Port accepting downstream consumers.
    pub egress_port: u16,
    /// Listen backlog for the ingress port.
    pub ingress_backlog: u32,
    /// Listen backlog for the egress port.
    pub egress_backlog: u32,
    /// Upper bound on one consumer's send during a broadcast. `None` waits
    /// for as long as the send takes.
    pub send_timeout: Option<Duration>,
    /// Back-off applied when `accept()` fails.
    pub backoff: BackoffConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ingress_port: DEFAULT_INGRESS_PORT,
            egress_port: DEFAULT_EGRESS_PORT,
            ingress_backlog: DEFAULT_INGRESS_BACKLOG,
            egress_backlog: DEFAULT_EGRESS_BACKLOG,
            send_timeout: None,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Socket address of the ingress listener.
    #[must_use]
    pub const fn ingress_addr(&self) -> SocketAddr { SocketAddr::new(self.bind_ip, self.ingress_port) }

    /// Socket address of the egress listener.
    #[must_use]
    pub const fn egress_addr(&self) -> SocketAddr { SocketAddr::new(self.bind_ip, self.egress_port) }
}

impl RelayServer<Unbound> {
    /// Create an unbound server from `config`.
    ///
    /// The egress registry is created here, so it can be inspected through
    /// [`registry`](RelayServer::registry) before and after binding.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let registry = EgressRegistry::new().with_send_timeout(config.send_timeout);
        Self {
            config,
            registry: Arc::new(registry),
            ready_tx: None,
            state: Unbound,
        }
    }
}

impl<S: ServerState> RelayServer<S> {
    /// Configure a channel used to signal when the server is accepting
    /// connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Configuration the server was created with.
    #[must_use]
    pub const fn config(&self) -> &RelayConfig { &self.config }

    /// Shared registry of downstream consumers.
    #[must_use]
    pub fn registry(&self) -> Arc<EgressRegistry> { Arc::clone(&self.registry) }
}
