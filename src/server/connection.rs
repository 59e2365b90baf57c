//! Per-connection handling for [`RelayServer`](super::RelayServer).
//!
//! Consumers accepted on the egress port are registered and then left alone:
//! their only further interaction is receiving broadcasts. Producers accepted
//! on the ingress port each get a tracked [`IngressSession`] task.

use std::{future::Future, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::net::TcpStream;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use super::{Role, runtime::ConnectionHandler};
use crate::{
    egress::EgressRegistry,
    ingress::{IngressSession, SessionEnd, SessionSummary},
    metrics,
    panic::format_panic,
};

/// Registers every accepted downstream consumer.
pub(super) struct EgressAcceptor {
    registry: Arc<EgressRegistry>,
}

impl EgressAcceptor {
    pub(super) fn new(registry: Arc<EgressRegistry>) -> Self { Self { registry } }
}

#[async_trait]
impl ConnectionHandler for EgressAcceptor {
    fn role(&self) -> Role { Role::Egress }

    async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let client_id = self.registry.register(stream, Some(peer)).await;
        info!(peer_addr = %peer, %client_id, "egress client connected");
    }
}

/// Starts an ingress session for every accepted upstream producer.
pub(super) struct IngressSpawner {
    registry: Arc<EgressRegistry>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl IngressSpawner {
    pub(super) fn new(
        registry: Arc<EgressRegistry>,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            tracker,
            shutdown,
        }
    }
}

#[async_trait]
impl ConnectionHandler for IngressSpawner {
    fn role(&self) -> Role { Role::Ingress }

    async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        info!(peer_addr = %peer, "ingress producer connected");
        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.clone();
        self.tracker.spawn(async move {
            let session = IngressSession::new(stream, registry).with_peer(Some(peer));
            supervise(peer, session.run(&shutdown)).await;
        });
    }
}

/// Drive a session to completion, logging how it ended.
///
/// A panic inside the session is caught, logged and counted. The session's
/// connection and buffer are released by unwinding either way.
async fn supervise<F>(peer: SocketAddr, session: F)
where
    F: Future<Output = SessionSummary>,
{
    match AssertUnwindSafe(session).catch_unwind().await {
        Ok(summary) => log_summary(peer, &summary),
        Err(panic) => {
            metrics::inc_session_panics();
            let panic_msg = format_panic(panic);
            error!(panic = %panic_msg, peer_addr = %peer, "ingress session panicked");
        }
    }
}

fn log_summary(peer: SocketAddr, summary: &SessionSummary) {
    let SessionSummary {
        end,
        forwarded,
        dropped,
    } = summary;
    match end {
        SessionEnd::PeerClosed => {
            info!(peer_addr = %peer, forwarded, dropped, "ingress producer disconnected");
        }
        SessionEnd::ReadFailed(error) => {
            warn!(peer_addr = %peer, %error, forwarded, dropped, "ingress read failed");
        }
        SessionEnd::Shutdown => {
            debug!(peer_addr = %peer, forwarded, dropped, "ingress session stopped for shutdown");
        }
    }
}
