//! A relay running on ephemeral loopback ports.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
    time::Duration,
};

use ctmp_relay::{EgressRegistry, RelayConfig, RelayServer, ServerError};
use rstest::fixture;
use tokio::{
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::{sleep, timeout},
};

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Default relay configuration; listeners are chosen by [`RunningRelay`].
#[fixture]
pub fn relay_config() -> RelayConfig { RelayConfig::default() }

fn free_listener() -> StdTcpListener {
    StdTcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
        .expect("failed to bind free port listener")
}

/// Handle to a relay running on a background task.
pub struct RunningRelay {
    ingress_addr: SocketAddr,
    egress_addr: SocketAddr,
    registry: Arc<EgressRegistry>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl RunningRelay {
    /// Bind both listeners on free loopback ports and run the relay until
    /// [`shutdown`](Self::shutdown) is called or the handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the listeners cannot be bound or the relay never signals
    /// readiness.
    pub async fn start(config: RelayConfig) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let server = RelayServer::new(config)
            .ready_signal(ready_tx)
            .bind_existing_listeners(free_listener(), free_listener())
            .expect("failed to adopt listeners");
        let ingress_addr = server.ingress_addr().expect("ingress addr");
        let egress_addr = server.egress_addr().expect("egress addr");
        let registry = server.registry();
        let (stop, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_with_shutdown(async {
            let _ = stop_rx.await;
        }));
        timeout(WAIT_LIMIT, ready_rx)
            .await
            .expect("relay did not become ready")
            .expect("relay dropped its ready signal");

        Self {
            ingress_addr,
            egress_addr,
            registry,
            stop: Some(stop),
            task,
        }
    }

    /// Address producers connect to.
    #[must_use]
    pub fn ingress_addr(&self) -> SocketAddr { self.ingress_addr }

    /// Address consumers connect to.
    #[must_use]
    pub fn egress_addr(&self) -> SocketAddr { self.egress_addr }

    /// The relay's consumer registry.
    #[must_use]
    pub fn registry(&self) -> &EgressRegistry { &self.registry }

    /// Connect a consumer and wait until the relay has registered it.
    ///
    /// # Panics
    ///
    /// Panics if the connection fails or registration does not happen in
    /// time. Must not race other consumers connecting concurrently.
    pub async fn connect_consumer(&self) -> TcpStream {
        let before = self.registry.len().await;
        let stream = TcpStream::connect(self.egress_addr)
            .await
            .expect("consumer connect failed");
        self.wait_for_clients(before + 1).await;
        stream
    }

    /// Connect a producer.
    ///
    /// The ingress session starts asynchronously; the relay buffers anything
    /// written before it does.
    ///
    /// # Panics
    ///
    /// Panics if the connection fails.
    pub async fn connect_producer(&self) -> TcpStream {
        TcpStream::connect(self.ingress_addr)
            .await
            .expect("producer connect failed")
    }

    /// Wait until exactly `count` consumers are registered.
    ///
    /// # Panics
    ///
    /// Panics if the count is not reached in time.
    pub async fn wait_for_clients(&self, count: usize) {
        timeout(WAIT_LIMIT, async {
            while self.registry.len().await != count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {count} clients"));
    }

    /// Stop the relay and wait for every task to finish.
    ///
    /// # Panics
    ///
    /// Panics if the relay task fails or does not stop in time.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(WAIT_LIMIT, &mut self.task)
            .await
            .expect("relay did not stop in time")
            .expect("relay task panicked")
            .expect("relay run failed");
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
