//! Prometheus metrics collection.
//!
//! Tracks connection registry occupancy, pipeline throughput, and cache
//! hit/miss rates. Exposed via `http::run_metrics_server` on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref CONNECTED_SESSIONS: IntGauge = IntGauge::new(
        "chat_connected_sessions",
        "Currently connected sessions"
    ).unwrap();

    pub static ref FRAMES_INGESTED: IntCounter = IntCounter::new(
        "chat_frames_ingested_total",
        "Total inbound frames appended to the log broker"
    ).unwrap();

    pub static ref FRAMES_DROPPED: IntCounter = IntCounter::new(
        "chat_frames_dropped_total",
        "Total malformed frames dropped before persistence"
    ).unwrap();

    pub static ref MESSAGES_FANNED_OUT: IntCounter = IntCounter::new(
        "chat_messages_fanned_out_total",
        "Total egress envelopes enqueued to connected sessions"
    ).unwrap();

    pub static ref MESSAGES_UNDELIVERED: IntCounter = IntCounter::new(
        "chat_messages_undelivered_total",
        "Total messages persisted UNSENT because the recipient was offline"
    ).unwrap();

    pub static ref CACHE_HITS: IntCounter = IntCounter::new(
        "chat_cache_hits_total",
        "Total cache reads that returned a value"
    ).unwrap();

    pub static ref CACHE_MISSES: IntCounter = IntCounter::new(
        "chat_cache_misses_total",
        "Total cache reads that fell through to the store"
    ).unwrap();
}

/// Register all metrics with the global registry. Call once at startup.
pub fn init() {
    REGISTRY.register(Box::new(CONNECTED_SESSIONS.clone())).unwrap();
    REGISTRY.register(Box::new(FRAMES_INGESTED.clone())).unwrap();
    REGISTRY.register(Box::new(FRAMES_DROPPED.clone())).unwrap();
    REGISTRY.register(Box::new(MESSAGES_FANNED_OUT.clone())).unwrap();
    REGISTRY.register(Box::new(MESSAGES_UNDELIVERED.clone())).unwrap();
    REGISTRY.register(Box::new(CACHE_HITS.clone())).unwrap();
    REGISTRY.register(Box::new(CACHE_MISSES.clone())).unwrap();
}

/// Render the current metric values in Prometheus text exposition format.
pub fn gather() -> String {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
