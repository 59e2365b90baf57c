//! Errors raised by [`RelayServer`](super::RelayServer).

use std::{io, net::SocketAddr};

use thiserror::Error;

use super::Role;

/// Errors that may occur while starting or running the server.
///
/// Only setup errors are returned to the caller. Once running, accept and
/// per-connection errors are logged and contained.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Creating, binding or listening on a socket failed.
    #[error("failed to bind {role} listener on {addr}: {source}")]
    Bind {
        /// Side of the relay the listener serves.
        role: Role,
        /// Requested address.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// An already bound listener could not be adopted.
    #[error("failed to adopt {role} listener: {source}")]
    Adopt {
        /// Side of the relay the listener serves.
        role: Role,
        /// Error from switching the listener to non-blocking mode or
        /// registering it with the reactor.
        #[source]
        source: io::Error,
    },
    /// Accepting a connection failed. Logged by the accept loop, which then
    /// backs off and retries.
    #[error("failed to accept {role} connection: {source}")]
    Accept {
        /// Side of the relay the listener serves.
        role: Role,
        /// Error returned by `accept`.
        #[source]
        source: io::Error,
    },
}
