//! Metric helpers for `wirefrag`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking fragments stored in the reassembly buffer.
pub const FRAGMENTS_ADMITTED: &str = "wirefrag_fragments_admitted_total";
/// Name of the counter tracking dropped packets, labelled by `reason`.
pub const FRAGMENTS_REJECTED: &str = "wirefrag_fragments_rejected_total";
/// Name of the counter tracking duplicate fragments.
pub const FRAGMENTS_DUPLICATE: &str = "wirefrag_fragments_duplicate_total";
/// Name of the counter tracking messages extracted from the buffer.
pub const MESSAGES_REASSEMBLED: &str = "wirefrag_messages_reassembled_total";
/// Name of the counter tracking entries evicted by window advance.
pub const ENTRIES_EVICTED: &str = "wirefrag_entries_evicted_total";
/// Name of the gauge tracking fragments currently buffered.
pub const BUFFERED_FRAGMENTS: &str = "wirefrag_buffered_fragments";

/// Record a fragment stored in the buffer.
pub fn inc_admitted() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_ADMITTED).increment(1);
}

/// Record a dropped packet for the given reason label.
pub fn inc_rejected(reason: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_REJECTED, "reason" => reason).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason;
}

/// Record a duplicate fragment.
pub fn inc_duplicate() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_DUPLICATE).increment(1);
}

/// Record `count` messages extracted from the buffer.
pub fn inc_reassembled(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_REASSEMBLED).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record `count` entries evicted by a window advance.
pub fn inc_evicted(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(ENTRIES_EVICTED).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Publish the number of fragments currently buffered.
#[cfg_attr(
    feature = "metrics",
    expect(
        clippy::cast_precision_loss,
        reason = "gauge values are f64; buffered counts stay far below 2^52"
    )
)]
pub fn set_buffered(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(BUFFERED_FRAGMENTS).set(count as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
