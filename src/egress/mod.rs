//! Downstream consumers: registry and fan-out.
//!
//! [`EgressRegistry`] owns every connected consumer behind a single lock.
//! The Egress Acceptor adds clients with [`EgressRegistry::register`]; ingress
//! sessions deliver validated frames with [`EgressRegistry::broadcast`], which
//! also prunes consumers that have hung up or failed a send. Dropping a
//! pruned client closes its socket.

mod fanout;
mod registry;
mod sink;

use std::{fmt, net::SocketAddr};

pub use fanout::BroadcastReport;
pub use registry::EgressRegistry;
pub use sink::{EgressSink, Liveness};

/// Identifier assigned to an egress client at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Create a [`ClientId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ClientId({})", self.0) }
}

/// A registered downstream consumer.
#[derive(Debug)]
pub(crate) struct EgressClient<C> {
    pub(crate) id: ClientId,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) sink: C,
}
