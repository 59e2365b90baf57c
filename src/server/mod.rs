//! Tokio-based connection supervisor for the relay.
//!
//! `RelayServer` owns the ingress and egress listeners. Running it spawns a
//! single Egress Acceptor, which registers every downstream consumer with the
//! shared [`EgressRegistry`], and an ingress accept loop that starts one
//! [`IngressSession`](crate::ingress::IngressSession) per upstream producer.
//! The two loops are independent: failures accepting on one port never
//! affect the other.

use std::{fmt, sync::Arc};

use tokio::{net::TcpListener, sync::oneshot};

use crate::egress::EgressRegistry;

/// Relay server for CTMP frames.
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// or [`Bound`]. New servers start `Unbound` and must call
/// [`RelayServer::bind`] or [`RelayServer::bind_existing_listeners`] before
/// running.
///
/// # Examples
///
/// ```no_run
/// use ctmp_relay::server::{RelayConfig, RelayServer, ServerError};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ServerError> {
/// let server = RelayServer::new(RelayConfig::default()).bind()?;
/// server.run().await
/// # }
/// ```
pub struct RelayServer<S = Unbound>
where
    S: ServerState,
{
    pub(crate) config: RelayConfig,
    pub(crate) registry: Arc<EgressRegistry>,
    /// Channel used to notify when the server is ready.
    ///
    /// A `oneshot::Sender` can transmit only one readiness notification, so
    /// a new sender must be provided each time a server is started.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    /// Typestate tracking whether the listeners have been bound.
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound its listeners.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating both listeners are bound.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) ingress: Arc<TcpListener>,
    pub(crate) egress: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

/// Which side of the relay a listener or connection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Upstream producers.
    Ingress,
    /// Downstream consumers.
    Egress,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Ingress => "ingress",
            Role::Egress => "egress",
        })
    }
}

pub mod binding;
mod config;
mod connection;
pub mod error;
mod runtime;

pub use binding::bind_listener;
pub use config::RelayConfig;
pub use error::ServerError;
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
