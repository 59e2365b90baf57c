#![doc(html_root_url = "https://docs.rs/ctmp_relay/latest")]
//! Public API for the `ctmp_relay` library.
//!
//! A relay for the CTMP framing protocol: frames arriving from an upstream
//! producer on the ingress port are validated and copied, unchanged, to every
//! consumer connected to the egress port.
//!
//! ```text
//! producer ──► ingress :33333 ──► validate ──► broadcast ──► egress :44444 ──► consumers
//! ```

pub mod byte_order;
pub mod egress;
pub mod frame;
pub mod ingress;
pub mod metrics;
pub mod panic;
pub mod server;

pub use egress::{BroadcastReport, ClientId, EgressRegistry, EgressSink, Liveness};
pub use frame::{Frame, FrameHeader, Rejection, encode, validate};
pub use ingress::{IngressSession, SessionEnd, SessionSummary};
pub use server::{RelayConfig, RelayServer, ServerError};
