//! Runtime control for [`RelayServer`].

mod accept;
mod backoff;
#[cfg(test)]
mod tests;

use std::sync::Arc;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, ConnectionHandler, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

use super::{
    Bound,
    RelayServer,
    ServerError,
    connection::{EgressAcceptor, IngressSpawner},
};

impl RelayServer<Bound> {
    /// Run the relay until Ctrl+C is received.
    ///
    /// Shuts down as described for
    /// [`run_with_shutdown`](Self::run_with_shutdown), including the wait on
    /// a broadcast stalled behind an undrained consumer.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ctmp_relay::server::{RelayConfig, RelayServer};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ctmp_relay::server::ServerError> {
    /// RelayServer::new(RelayConfig::default()).bind()?.run().await
    /// # }
    /// ```
    ///
    /// Attempting to run a server without binding fails to compile:
    ///
    /// ```compile_fail
    /// use ctmp_relay::server::{RelayConfig, RelayServer};
    ///
    /// async fn try_run() {
    ///     RelayServer::new(RelayConfig::default())
    ///         .run()
    ///         .await
    ///         .expect("unbound servers do not expose run()");
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Never fails once bound; the `Result` is kept for parity with
    /// [`RelayServer::bind`]. Accept failures are retried with exponential
    /// back-off and do not surface as errors.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the relay until the `shutdown` future resolves.
    ///
    /// Spawns the egress acceptor and the ingress accept loop. On shutdown
    /// both loops stop accepting, every ingress session stops at its next
    /// frame boundary, and this returns once all of them have finished.
    ///
    /// A broadcast already in progress is never interrupted. Without a
    /// [`send_timeout`](super::RelayConfig::send_timeout), a consumer that
    /// stops draining keeps that pass, and therefore this call, from
    /// returning after `shutdown` resolves. Set a send timeout if shutdown
    /// must complete in bounded time.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::TcpListener;
    ///
    /// use ctmp_relay::server::{RelayConfig, RelayServer};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let server = RelayServer::new(RelayConfig::default()).bind_existing_listeners(
    ///     TcpListener::bind("127.0.0.1:0")?,
    ///     TcpListener::bind("127.0.0.1:0")?,
    /// )?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(server.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    ///
    /// let _ = tx.send(());
    /// handle.await??;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Never fails once bound. Accept failures are retried with exponential
    /// back-off and do not surface as errors.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let RelayServer {
            config,
            registry,
            ready_tx,
            state: Bound { ingress, egress },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let options = AcceptLoopOptions {
            shutdown: shutdown_token.clone(),
            backoff: config.backoff,
        };

        tracker.spawn(accept_loop(
            egress,
            EgressAcceptor::new(Arc::clone(&registry)),
            options.clone(),
        ));
        tracker.spawn(accept_loop(
            ingress,
            IngressSpawner::new(registry, tracker.clone(), shutdown_token.clone()),
            options,
        ));
        info!("relay running");

        // Signal readiness after both accept loops have been spawned.
        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        info!("relay stopped");
        Ok(())
    }
}
