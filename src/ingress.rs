//! Upstream producer sessions.
//!
//! One [`IngressSession`] services one upstream connection: each read yields
//! one candidate frame, which is validated and either broadcast to the
//! egress registry or dropped. The session owns its receive buffer and its
//! connection; both are released on every exit path, panics included, by
//! drop.

use std::{io, net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    select,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    egress::{EgressRegistry, EgressSink},
    frame::{MAX_FRAME_LEN, validate},
    metrics,
};

/// Why an ingress session stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// The producer closed the connection.
    PeerClosed,
    /// Reading from the connection failed.
    ReadFailed(io::Error),
    /// The relay is shutting down.
    Shutdown,
}

/// Counters reported when a session ends.
#[derive(Debug)]
pub struct SessionSummary {
    /// Reason the session stopped.
    pub end: SessionEnd,
    /// Frames that passed validation and were broadcast.
    pub forwarded: u64,
    /// Frames rejected by the validator.
    pub dropped: u64,
}

/// RAII guard keeping the ingress sessions gauge in step with running sessions.
struct ActiveSession;

impl ActiveSession {
    fn new() -> Self {
        metrics::inc_ingress_sessions();
        Self
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) { metrics::dec_ingress_sessions(); }
}

/// Read-validate-forward loop for one upstream connection.
pub struct IngressSession<R, C> {
    reader: R,
    peer: Option<SocketAddr>,
    registry: Arc<EgressRegistry<C>>,
}

impl<R, C> IngressSession<R, C>
where
    R: AsyncRead + Unpin,
    C: EgressSink,
{
    /// Create a session reading from `reader` and forwarding to `registry`.
    #[must_use]
    pub fn new(reader: R, registry: Arc<EgressRegistry<C>>) -> Self {
        Self {
            reader,
            peer: None,
            registry,
        }
    }

    /// Record the producer's address for diagnostics.
    #[must_use]
    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    /// Service the connection until the producer closes it, a read fails,
    /// or `shutdown` is cancelled.
    ///
    /// Shutdown is only observed between frames; a broadcast already in
    /// progress always completes.
    pub async fn run(mut self, shutdown: &CancellationToken) -> SessionSummary {
        let _active = ActiveSession::new();
        let mut buf = vec![0u8; MAX_FRAME_LEN];
        let mut forwarded = 0;
        let mut dropped = 0;

        let end = loop {
            let read = select! {
                biased;

                () = shutdown.cancelled() => break SessionEnd::Shutdown,
                res = self.reader.read(&mut buf) => res,
            };
            let len = match read {
                Ok(0) => break SessionEnd::PeerClosed,
                Ok(len) => len,
                Err(error) => break SessionEnd::ReadFailed(error),
            };
            metrics::inc_frames_received();

            match validate(&buf[..len]) {
                Ok(frame) => {
                    let report = self.registry.broadcast(frame.as_bytes()).await;
                    metrics::inc_frames_forwarded();
                    forwarded += 1;
                    debug!(
                        peer_addr = ?self.peer,
                        len,
                        delivered = report.delivered,
                        pruned = report.pruned,
                        "frame forwarded"
                    );
                }
                Err(rejection) => {
                    metrics::inc_frames_dropped(rejection.reason());
                    dropped += 1;
                    debug!(
                        peer_addr = ?self.peer,
                        len,
                        reason = rejection.reason(),
                        %rejection,
                        "frame dropped"
                    );
                }
            }
        };

        SessionSummary {
            end,
            forwarded,
            dropped,
        }
    }
}
