//! Per-client transport used by the fan-out.

use std::io;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    io::{AsyncWriteExt, Interest},
    net::TcpStream,
};

/// Result of a non-blocking readiness check on an egress client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// No hangup or error is pending; a send may be attempted.
    Connected,
    /// The peer closed its side of the connection.
    Closed,
    /// The socket reported an error.
    Errored,
}

/// Destination the fan-out writes frames to.
///
/// Implementations must never block in [`probe`](Self::probe): it is called
/// with the registry lock held, once per client per broadcast.
#[async_trait]
pub trait EgressSink: Send + 'static {
    /// Check, without blocking, whether the client has hung up or errored.
    fn probe(&self) -> Liveness;

    /// Write the whole of `frame`.
    ///
    /// Any error, including a short write, disqualifies the client.
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl EgressSink for TcpStream {
    /// Polls the socket's readiness once.
    ///
    /// Readable data alone does not count as a hangup; consumers are not
    /// expected to write, and anything they send is left unread.
    fn probe(&self) -> Liveness {
        match self
            .ready(Interest::READABLE | Interest::ERROR)
            .now_or_never()
        {
            None => Liveness::Connected,
            Some(Err(_)) => Liveness::Errored,
            Some(Ok(ready)) if ready.is_error() => Liveness::Errored,
            Some(Ok(ready)) if ready.is_read_closed() || ready.is_write_closed() => {
                Liveness::Closed
            }
            Some(Ok(_)) => Liveness::Connected,
        }
    }

    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> { self.write_all(frame).await }
}

#[cfg(test)]
mod tests {
    use tokio::{
        net::{TcpListener, TcpStream},
        time::{Duration, sleep},
    };

    use super::*;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let client = TcpStream::connect(addr).await.expect("connect");
        let (server, _) = listener.accept().await.expect("accept");
        (server, client)
    }

    #[tokio::test]
    async fn idle_peer_probes_connected() {
        let (server, _client) = connected_pair().await;
        assert_eq!(server.probe(), Liveness::Connected);
    }

    #[tokio::test]
    async fn closed_peer_probes_closed() {
        let (server, client) = connected_pair().await;
        drop(client);
        sleep(Duration::from_millis(50)).await;
        assert_ne!(server.probe(), Liveness::Connected);
    }

    #[tokio::test]
    async fn send_to_reset_peer_returns_an_error() {
        let (mut server, client) = connected_pair().await;
        client.set_linger(Some(Duration::ZERO)).expect("set linger");
        drop(client);
        sleep(Duration::from_millis(50)).await;

        let mut outcome = Ok(());
        for _ in 0..10 {
            outcome = server.send_frame(&[0xCC, 0, 0, 0, 0, 0, 0, 0]).await;
            if outcome.is_err() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        let error = outcome.expect_err("writes to a reset peer kept succeeding");
        assert!(
            matches!(
                error.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
            ),
            "unexpected error kind: {error}"
        );
    }

    #[tokio::test]
    async fn send_frame_writes_every_byte() {
        use tokio::io::AsyncReadExt;

        let (mut server, mut client) = connected_pair().await;
        server.send_frame(&[0xCC, 0, 0, 0, 0, 0, 0, 0]).await.expect("send");
        let mut buf = [0u8; 8];
        client.read_exact(&mut buf).await.expect("read");
        assert_eq!(buf, [0xCC, 0, 0, 0, 0, 0, 0, 0]);
    }
}
