//! Utilities for driving a [`RelayServer`](ctmp_relay::RelayServer) over real
//! loopback sockets during tests.
//!
//! [`RunningRelay`] binds both listeners on ephemeral ports, runs the relay
//! on a background task and hands out connected producers and consumers.
//! [`read_frame`] reads exactly one CTMP frame from a consumer.
//!
//! ```rust,no_run
//! use ctmp_relay::{RelayConfig, encode};
//! use ctmp_relay_testing::{RunningRelay, read_frame};
//! use tokio::io::AsyncWriteExt;
//!
//! # async fn example() -> std::io::Result<()> {
//! let relay = RunningRelay::start(RelayConfig::default()).await;
//! let mut consumer = relay.connect_consumer().await;
//! let mut producer = relay.connect_producer().await;
//! let frame = encode(0, b"hello").expect("encode");
//! producer.write_all(&frame).await?;
//! assert_eq!(read_frame(&mut consumer).await?, frame);
//! relay.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod frames;
pub mod metrics;
pub mod relay;

pub use frames::{assert_silent, read_frame};
pub use metrics::{debugging_recorder_setup, sum_counter};
pub use relay::{RunningRelay, relay_config};
