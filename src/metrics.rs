//! Prometheus metrics collection.
//!
//! Exposed on `GET /metrics` alongside the chat socket, in Prometheus text
//! format.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref MESSAGES_RELAYED: IntCounter = IntCounter::new(
        "rendezvous_messages_relayed_total",
        "Total text messages relayed between paired users"
    ).unwrap();

    pub static ref MATCHES_MADE: IntCounter = IntCounter::new(
        "rendezvous_matches_made_total",
        "Total pairs created by the matching queue"
    ).unwrap();

    pub static ref BANS_ISSUED: IntCounter = IntCounter::new(
        "rendezvous_bans_issued_total",
        "Total IP bans issued by abuse enforcement"
    ).unwrap();

    pub static ref RATE_LIMITED: IntCounter = IntCounter::new(
        "rendezvous_rate_limited_total",
        "Total actions rejected by rate limiting"
    ).unwrap();

    pub static ref CONNECTED_USERS: IntGauge = IntGauge::new(
        "rendezvous_connected_users",
        "Currently connected users"
    ).unwrap();

    pub static ref QUEUED_TEXT: IntGauge = IntGauge::new(
        "rendezvous_queue_depth_text",
        "Users currently waiting in the text queue"
    ).unwrap();

    pub static ref QUEUED_VIDEO: IntGauge = IntGauge::new(
        "rendezvous_queue_depth_video",
        "Users currently waiting in the video queue"
    ).unwrap();

    pub static ref QUEUED_VOICE: IntGauge = IntGauge::new(
        "rendezvous_queue_depth_voice",
        "Users currently waiting in the voice queue"
    ).unwrap();
}

/// The queue-depth gauge for a given mode, for callers that mutate the
/// queue and need to keep `QUEUED_*` in step.
pub fn queue_gauge(mode: crate::queue::Mode) -> &'static IntGauge {
    match mode {
        crate::queue::Mode::Text => &QUEUED_TEXT,
        crate::queue::Mode::Video => &QUEUED_VIDEO,
        crate::queue::Mode::Voice => &QUEUED_VOICE,
    }
}

/// Register every metric. Must be called once at startup before any metric
/// is recorded.
pub fn init() {
    for metric in [
        Box::new(MESSAGES_RELAYED.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(MATCHES_MADE.clone()),
        Box::new(BANS_ISSUED.clone()),
        Box::new(RATE_LIMITED.clone()),
        Box::new(CONNECTED_USERS.clone()),
        Box::new(QUEUED_TEXT.clone()),
        Box::new(QUEUED_VIDEO.clone()),
        Box::new(QUEUED_VOICE.clone()),
    ] {
        let _ = REGISTRY.register(metric);
    }
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap_or_default()
}
