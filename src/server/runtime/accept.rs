//! Accept-loop utilities for the relay runtime.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    time::{Duration, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::backoff::BackoffConfig;
use crate::server::{Role, ServerError};

/// Abstraction for sources of incoming connections consumed by the accept loop.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::server) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

/// What an accept loop does with each accepted connection.
///
/// `handle` runs on the accept loop's task, so the next `accept()` waits for
/// it. Long-lived work must be spawned.
#[async_trait]
pub(in crate::server) trait ConnectionHandler: Send + Sync + 'static {
    /// Side of the relay this handler serves.
    fn role(&self) -> Role;

    /// Take ownership of an accepted connection.
    async fn handle(&self, stream: TcpStream, peer: SocketAddr);
}

#[derive(Clone, Debug)]
pub(in crate::server) struct AcceptLoopOptions {
    pub shutdown: CancellationToken,
    pub backoff: BackoffConfig,
}

/// Accepts connections from `listener` and passes each one to `handler`.
///
/// Failures to accept trigger an exponential back-off governed by
/// `options.backoff`; they never end the loop. The loop terminates when
/// `options.shutdown` is cancelled.
pub(in crate::server) async fn accept_loop<L, H>(
    listener: Arc<L>,
    handler: H,
    options: AcceptLoopOptions,
) where
    L: AcceptListener + 'static,
    H: ConnectionHandler,
{
    let AcceptLoopOptions { shutdown, backoff } = options;
    let backoff = backoff.normalized();
    debug_assert!(
        backoff.initial_delay <= backoff.max_delay,
        "BackoffConfig invariant violated: initial_delay > max_delay"
    );
    let mut delay = backoff.initial_delay;
    while let Some(next_delay) =
        accept_iteration(&*listener, &handler, &shutdown, &backoff, delay).await
    {
        delay = next_delay;
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn accept_iteration<L, H>(
    listener: &L,
    handler: &H,
    shutdown: &CancellationToken,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    L: AcceptListener,
    H: ConnectionHandler,
{
    select! {
        biased;

        () = shutdown.cancelled() => None,
        res = listener.accept() => Some(match res {
            Ok((stream, peer)) => {
                handler.handle(stream, peer).await;
                backoff.initial_delay
            }
            Err(source) => {
                let error = ServerError::Accept { role: handler.role(), source };
                let local_addr = listener.local_addr().ok();
                warn!(%error, ?local_addr, retry_in = ?delay, "accept failed");
                // Shutdown must still interrupt a long back-off.
                select! {
                    biased;

                    () = shutdown.cancelled() => return None,
                    () = sleep(delay) => {}
                }
                (delay * 2).min(backoff.max_delay)
            }
        }),
    }
}
