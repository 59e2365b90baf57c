//! Lock-guarded collection of egress clients.

use std::net::SocketAddr;

use tokio::{net::TcpStream, sync::Mutex, time::Duration};
use tracing::debug;

use super::{ClientId, EgressClient, EgressSink};

/// Registered clients and the next identifier to hand out.
///
/// Both live under the same lock so identifiers are assigned in registration
/// order.
#[derive(Debug)]
pub(super) struct Clients<C> {
    pub(super) next_id: u64,
    pub(super) entries: Vec<EgressClient<C>>,
}

/// Set of connected downstream consumers.
///
/// Every enumeration and mutation takes the same lock, and a broadcast holds
/// it for its whole pass. A client registering while a broadcast is in
/// flight therefore either receives that whole frame or none of it.
///
/// # Examples
///
/// ```
/// use ctmp_relay::egress::EgressRegistry;
/// use tokio::net::TcpStream;
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry: EgressRegistry<TcpStream> = EgressRegistry::new();
/// let report = registry.broadcast(&[0xCC, 0, 0, 0, 0, 0, 0, 0]).await;
/// assert_eq!(report.delivered, 0);
/// assert!(registry.is_empty().await);
/// # }
/// ```
#[derive(Debug)]
pub struct EgressRegistry<C = TcpStream> {
    pub(super) clients: Mutex<Clients<C>>,
    pub(super) send_timeout: Option<Duration>,
}

impl<C: EgressSink> Default for EgressRegistry<C> {
    fn default() -> Self { Self::new() }
}

impl<C: EgressSink> EgressRegistry<C> {
    /// Create an empty registry with no send timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Clients {
                next_id: 0,
                entries: Vec::new(),
            }),
            send_timeout: None,
        }
    }

    /// Bound how long one client's send may take during a broadcast.
    ///
    /// A send that exceeds the limit counts as a failed send and prunes the
    /// client. `None` leaves sends unbounded.
    #[must_use]
    pub fn with_send_timeout(mut self, limit: Option<Duration>) -> Self {
        self.send_timeout = limit;
        self
    }

    /// Configured per-client send limit.
    #[must_use]
    pub const fn send_timeout(&self) -> Option<Duration> { self.send_timeout }

    /// Add a newly accepted consumer and return its identifier.
    pub async fn register(&self, sink: C, peer: Option<SocketAddr>) -> ClientId {
        let mut clients = self.clients.lock().await;
        let id = ClientId::new(clients.next_id);
        clients.next_id += 1;
        clients.entries.push(EgressClient { id, peer, sink });
        crate::metrics::inc_egress_clients();
        debug!(
            client_id = %id,
            peer_addr = ?peer,
            total = clients.entries.len(),
            "egress client registered"
        );
        id
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize { self.clients.lock().await.entries.len() }

    /// Whether no clients are registered.
    pub async fn is_empty(&self) -> bool { self.clients.lock().await.entries.is_empty() }

    /// Identifiers of the registered clients in registration order.
    pub async fn client_ids(&self) -> Vec<ClientId> {
        self.clients
            .lock()
            .await
            .entries
            .iter()
            .map(|client| client.id)
            .collect()
    }
}
