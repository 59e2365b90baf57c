//! Tests for server runtime behaviour.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::yield_now,
    time::{Duration, Instant, advance, sleep, timeout},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_test::traced_test;

use super::{AcceptLoopOptions, BackoffConfig, ConnectionHandler, MockAcceptListener, accept_loop};
use crate::{
    frame::encode,
    server::{RelayConfig, Role, test_util::bind_server},
};

/// Handler that only counts the connections it is given.
#[derive(Clone, Default)]
struct CountingHandler(Arc<AtomicUsize>);

#[async_trait]
impl ConnectionHandler for CountingHandler {
    fn role(&self) -> Role { Role::Ingress }

    async fn handle(&self, _stream: TcpStream, _peer: SocketAddr) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[fixture]
fn handler() -> CountingHandler { CountingHandler::default() }

fn options(token: &CancellationToken, backoff: BackoffConfig) -> AcceptLoopOptions {
    AcceptLoopOptions {
        shutdown: token.clone(),
        backoff,
    }
}

#[tokio::test]
async fn test_run_with_immediate_shutdown() {
    let server = bind_server(RelayConfig::default());
    let shutdown_future = async { sleep(Duration::from_millis(10)).await };
    let result = timeout(
        Duration::from_millis(1000),
        server.run_with_shutdown(shutdown_future),
    )
    .await;
    assert!(result.is_ok());
    assert!(result.expect("server did not finish in time").is_ok());
}

#[tokio::test]
async fn test_ready_signal_fires_once_running() {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = bind_server(RelayConfig::default()).ready_signal(ready_tx);
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    timeout(Duration::from_secs(1), ready_rx)
        .await
        .expect("ready signal timed out")
        .expect("ready sender dropped");
    let _ = stop_tx.send(());
    handle
        .await
        .expect("server join error")
        .expect("server run failed");
}

#[tokio::test]
async fn test_shutdown_stops_connected_sessions() {
    let server = bind_server(RelayConfig::default());
    let ingress_addr = server.ingress_addr().expect("ingress addr");
    let egress_addr = server.egress_addr().expect("egress addr");
    let registry = server.registry();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let mut consumer = TcpStream::connect(egress_addr).await.expect("connect consumer");
    let _producer = TcpStream::connect(ingress_addr).await.expect("connect producer");
    while registry.is_empty().await {
        yield_now().await;
    }

    drop(registry);
    let _ = stop_tx.send(());
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("idle producer held the relay open")
        .expect("server join error")
        .expect("server run failed");

    // Stopping drops the last handle on the registry, closing every consumer.
    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_secs(1), consumer.read(&mut buf))
        .await
        .expect("consumer was not closed");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[rstest]
#[tokio::test]
async fn test_accept_loop_shutdown_signal(handler: CountingHandler) {
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let listener = Arc::new(
        TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener"),
    );

    tracker.spawn(accept_loop(
        listener,
        handler,
        options(&token, BackoffConfig::default()),
    ));

    token.cancel();
    tracker.close();

    let result = timeout(Duration::from_millis(100), tracker.wait()).await;
    assert!(result.is_ok());
}

#[rstest]
#[tokio::test]
async fn test_accept_loop_hands_over_each_connection(handler: CountingHandler) {
    let token = CancellationToken::new();
    let listener = Arc::new(
        TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener"),
    );
    let addr = listener.local_addr().expect("local_addr");
    let count = Arc::clone(&handler.0);
    let task = tokio::spawn(accept_loop(
        listener,
        handler,
        options(&token, BackoffConfig::default()),
    ));

    let _a = TcpStream::connect(addr).await.expect("connect");
    let _b = TcpStream::connect(addr).await.expect("connect");
    timeout(Duration::from_secs(1), async {
        while count.load(Ordering::SeqCst) < 2 {
            yield_now().await;
        }
    })
    .await
    .expect("connections were not handed over");

    token.cancel();
    task.await.expect("accept loop panicked");
}

/// Times at which a mocked listener was asked to accept.
type AcceptLog = Arc<Mutex<Vec<Instant>>>;

/// Listener whose every accept is aborted by the peer.
///
/// `attempts` bounds how many accepts the loop may make; `None` leaves it
/// failing for as long as the test runs.
fn aborting_listener(log: &AcceptLog, attempts: Option<usize>) -> MockAcceptListener {
    let mut listener = MockAcceptListener::new();
    let log = Arc::clone(log);
    let accept = listener.expect_accept().returning(move || {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().expect("lock").push(Instant::now());
            Err(io::Error::from(io::ErrorKind::ConnectionAborted))
        })
    });
    if let Some(limit) = attempts {
        accept.times(limit);
    }
    listener
        .expect_local_addr()
        .returning(|| Ok(RelayConfig::default().ingress_addr()));
    listener
}

/// Validates that recorded call intervals match expected backoff delays.
fn assert_backoff_intervals(
    calls: &[Instant],
    expected: &[Duration],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let intervals: Vec<_> = calls
        .windows(2)
        .map(|window| match window {
            [a, b] => b
                .checked_duration_since(*a)
                .ok_or_else(|| "instants should be monotonically increasing".to_string()),
            _ => Err("window should hold two instants".to_string()),
        })
        .collect::<Result<_, _>>()?;

    if intervals.as_slice() != expected {
        return Err(format!("interval mismatch: got {intervals:?}, expected {expected:?}").into());
    }
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_accept_loop_exponential_backoff_async(
    handler: CountingHandler,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let calls: AcceptLog = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(aborting_listener(&calls, Some(4)));
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let backoff = BackoffConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    };

    tracker.spawn(accept_loop(listener, handler, options(&token, backoff)));

    yield_now().await;

    let first_call = {
        let calls = calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        calls.first().copied().expect("call record missing")
    };

    for ms in [5, 10, 20] {
        advance(Duration::from_millis(ms)).await;
        yield_now().await;
    }

    // The loop is now backing off after its fourth failure; cancelling must
    // interrupt the sleep without another accept.
    token.cancel();
    tracker.close();
    tracker.wait().await;

    let calls = calls.lock().expect("lock");
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.first().copied(), Some(first_call));
    let expected = [
        Duration::from_millis(5),
        Duration::from_millis(10),
        Duration::from_millis(20),
    ];
    assert_backoff_intervals(&calls, &expected)?;
    Ok(())
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_accept_failures_are_logged_with_role(handler: CountingHandler) {
    let calls: AcceptLog = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(aborting_listener(&calls, Some(1)));
    let token = CancellationToken::new();

    let accept = accept_loop(listener, handler, options(&token, BackoffConfig::default()));
    let stop = async {
        yield_now().await;
        token.cancel();
    };
    tokio::join!(accept, stop);

    assert!(logs_contain("accept failed"));
    assert!(logs_contain("failed to accept ingress connection"));
}

/// A failing ingress listener must not stop consumers from registering or
/// receiving frames produced elsewhere.
#[rstest]
#[tokio::test]
async fn test_ingress_accept_failures_leave_egress_running(handler: CountingHandler) {
    let calls: AcceptLog = Arc::new(Mutex::new(Vec::new()));
    let failing = aborting_listener(&calls, None);

    let server = bind_server(RelayConfig::default());
    let egress_addr = server.egress_addr().expect("egress addr");
    let registry = server.registry();
    let token = CancellationToken::new();
    let backoff = BackoffConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };
    let tracker = TaskTracker::new();
    tracker.spawn(accept_loop(Arc::new(failing), handler, options(&token, backoff)));
    tracker.spawn(accept_loop(
        Arc::clone(&server.state.egress),
        crate::server::connection::EgressAcceptor::new(Arc::clone(&registry)),
        options(&token, backoff),
    ));

    timeout(Duration::from_secs(1), async {
        while calls.lock().expect("lock").len() < 3 {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("ingress listener did not keep retrying");

    let mut consumer = TcpStream::connect(egress_addr).await.expect("connect consumer");
    timeout(Duration::from_secs(1), async {
        while registry.is_empty().await {
            yield_now().await;
        }
    })
    .await
    .expect("consumer was not registered");

    let frame = encode(0, b"still flowing").expect("encode");
    registry.broadcast(&frame).await;
    let mut received = vec![0u8; frame.len()];
    consumer.read_exact(&mut received).await.expect("read frame");
    assert_eq!(received, frame.as_ref());

    token.cancel();
    tracker.close();
    tracker.wait().await;
}
