//! Listener binding for [`RelayServer`].
//!
//! Provides the listening-socket provider and the `Unbound` to `Bound`
//! typestate transitions.

use std::{
    io,
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use super::{Bound, RelayServer, Role, ServerError, Unbound};

/// Create a listening TCP socket on `addr` with the given backlog.
///
/// The socket has `SO_REUSEADDR` set so a restarted relay can rebind ports
/// still in `TIME_WAIT`. Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the socket cannot be created, bound or
/// put into the listening state.
pub fn bind_listener(role: Role, addr: SocketAddr, backlog: u32) -> Result<TcpListener, ServerError> {
    listen(addr, backlog).map_err(|source| ServerError::Bind { role, addr, source })
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

fn adopt(role: Role, std: StdTcpListener) -> Result<TcpListener, ServerError> {
    std.set_nonblocking(true)
        .and_then(|()| TcpListener::from_std(std))
        .map_err(|source| ServerError::Adopt { role, source })
}

impl RelayServer<Unbound> {
    /// Bind the ingress and egress listeners described by the configuration.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] naming the first listener that could not
    /// be bound.
    pub fn bind(self) -> Result<RelayServer<Bound>, ServerError> {
        let ingress = bind_listener(
            Role::Ingress,
            self.config.ingress_addr(),
            self.config.ingress_backlog,
        )?;
        let egress = bind_listener(
            Role::Egress,
            self.config.egress_addr(),
            self.config.egress_backlog,
        )?;
        Ok(self.with_listeners(ingress, egress))
    }

    /// Adopt already bound standard listeners.
    ///
    /// The configured addresses and backlogs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Adopt`] if either listener cannot be switched to
    /// non-blocking mode or registered with the runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::TcpListener;
    ///
    /// use ctmp_relay::server::{RelayConfig, RelayServer};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let ingress = TcpListener::bind("127.0.0.1:0")?;
    /// let egress = TcpListener::bind("127.0.0.1:0")?;
    /// let server = RelayServer::new(RelayConfig::default()).bind_existing_listeners(ingress, egress)?;
    /// assert_ne!(server.ingress_addr()?, server.egress_addr()?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn bind_existing_listeners(
        self,
        ingress: StdTcpListener,
        egress: StdTcpListener,
    ) -> Result<RelayServer<Bound>, ServerError> {
        let ingress = adopt(Role::Ingress, ingress)?;
        let egress = adopt(Role::Egress, egress)?;
        Ok(self.with_listeners(ingress, egress))
    }

    fn with_listeners(self, ingress: TcpListener, egress: TcpListener) -> RelayServer<Bound> {
        let ingress_addr = ingress.local_addr().ok();
        let egress_addr = egress.local_addr().ok();
        info!(?ingress_addr, ?egress_addr, "relay listeners bound");
        RelayServer {
            config: self.config,
            registry: self.registry,
            ready_tx: self.ready_tx,
            state: Bound {
                ingress: Arc::new(ingress),
                egress: Arc::new(egress),
            },
        }
    }
}

impl RelayServer<Bound> {
    /// Address the ingress listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`TcpListener::local_addr`].
    pub fn ingress_addr(&self) -> io::Result<SocketAddr> { self.state.ingress.local_addr() }

    /// Address the egress listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`TcpListener::local_addr`].
    pub fn egress_addr(&self) -> io::Result<SocketAddr> { self.state.egress.local_addr() }
}
