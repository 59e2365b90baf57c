//! Metric helpers for the relay.
//!
//! This module defines metric names and small helpers wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Counter of candidate frames read from ingress connections.
pub const FRAMES_RECEIVED: &str = "ctmp_relay_frames_received_total";
/// Counter of frames that passed validation and were broadcast.
pub const FRAMES_FORWARDED: &str = "ctmp_relay_frames_forwarded_total";
/// Counter of rejected frames, labelled by `reason`.
pub const FRAMES_DROPPED: &str = "ctmp_relay_frames_dropped_total";
/// Gauge of registered egress clients.
pub const EGRESS_CLIENTS: &str = "ctmp_relay_egress_clients";
/// Counter of egress clients removed from the registry, labelled by `cause`.
pub const EGRESS_PRUNED: &str = "ctmp_relay_egress_pruned_total";
/// Gauge of running ingress sessions.
pub const INGRESS_SESSIONS: &str = "ctmp_relay_ingress_sessions";
/// Counter of ingress session tasks that panicked.
pub const SESSION_PANICS: &str = "ctmp_relay_session_panics_total";

/// Why an egress client was pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneCause {
    /// The readiness probe saw the peer hang up.
    Closed,
    /// The readiness probe saw a socket error.
    Errored,
    /// Writing the frame failed or timed out.
    SendFailed,
}

impl PruneCause {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PruneCause::Closed => "closed",
            PruneCause::Errored => "errored",
            PruneCause::SendFailed => "send_failed",
        }
    }
}

/// Record a candidate frame read from an ingress connection.
pub fn inc_frames_received() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_RECEIVED).increment(1);
}

/// Record a frame handed to the fan-out.
pub fn inc_frames_forwarded() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_FORWARDED).increment(1);
}

/// Record a rejected frame.
pub fn inc_frames_dropped(reason: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_DROPPED, "reason" => reason).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason;
}

/// Record a newly registered egress client.
pub fn inc_egress_clients() {
    #[cfg(feature = "metrics")]
    gauge!(EGRESS_CLIENTS).increment(1.0);
}

/// Record an egress client leaving the registry.
pub fn record_prune(cause: PruneCause) {
    #[cfg(feature = "metrics")]
    {
        gauge!(EGRESS_CLIENTS).decrement(1.0);
        counter!(EGRESS_PRUNED, "cause" => cause.as_str()).increment(1);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = cause;
}

/// Increment the ingress sessions gauge.
pub fn inc_ingress_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(INGRESS_SESSIONS).increment(1.0);
}

/// Decrement the ingress sessions gauge.
pub fn dec_ingress_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(INGRESS_SESSIONS).decrement(1.0);
}

/// Record a panicking ingress session.
pub fn inc_session_panics() {
    #[cfg(feature = "metrics")]
    counter!(SESSION_PANICS).increment(1);
}
