//! Broadcast of validated frames to every registered client.

use tokio::time::timeout;
use tracing::{debug, warn};

use super::{EgressClient, EgressRegistry, EgressSink, Liveness};
use crate::metrics::{PruneCause, record_prune};

/// Outcome of one broadcast pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients that received the whole frame.
    pub delivered: usize,
    /// Clients removed during the pass.
    pub pruned: usize,
}

impl<C: EgressSink> EgressRegistry<C> {
    /// Send `frame` to every registered client.
    ///
    /// Each client is probed first; a client that has hung up or errored is
    /// dropped without a send. Any send failure also drops the client. The
    /// lock is held for the whole pass, so broadcasts never interleave with
    /// each other or with registrations. Survivors keep their order.
    ///
    /// Callers should not cancel a pass midway: the client whose send was
    /// interrupted may have received a partial frame.
    pub async fn broadcast(&self, frame: &[u8]) -> BroadcastReport {
        let mut clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();

        // Index-based so a removal never invalidates the walk, and an
        // abandoned pass leaves the unvisited clients registered.
        let mut index = 0;
        while let Some(client) = clients.entries.get_mut(index) {
            match self.deliver(client, frame).await {
                Ok(()) => {
                    report.delivered += 1;
                    index += 1;
                }
                Err(cause) => {
                    let client = clients.entries.remove(index);
                    report.pruned += 1;
                    record_prune(cause);
                    debug!(
                        client_id = %client.id,
                        peer_addr = ?client.peer,
                        cause = cause.as_str(),
                        "egress client removed"
                    );
                    // Dropping the client closes its socket.
                    drop(client);
                }
            }
        }

        report
    }

    async fn deliver(&self, client: &mut EgressClient<C>, frame: &[u8]) -> Result<(), PruneCause> {
        match client.sink.probe() {
            Liveness::Connected => {}
            Liveness::Closed => return Err(PruneCause::Closed),
            Liveness::Errored => return Err(PruneCause::Errored),
        }

        let sent = match self.send_timeout {
            Some(limit) => match timeout(limit, client.sink.send_frame(frame)).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "egress send timed out",
                )),
            },
            None => client.sink.send_frame(frame).await,
        };

        sent.map_err(|error| {
            warn!(
                client_id = %client.id,
                peer_addr = ?client.peer,
                %error,
                "egress send failed"
            );
            PruneCause::SendFailed
        })
    }
}
