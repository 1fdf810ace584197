use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref TICKS: IntCounterVec = IntCounterVec::new(
        Opts::new("scheduler_ticks_total", "Units of work run by each scheduler"),
        &["job"]
    ).expect("valid metric definition");

    pub static ref TICK_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("scheduler_tick_failures_total", "Units of work that returned an error"),
        &["job"]
    ).expect("valid metric definition");

    pub static ref POINTS_SAVED: IntCounter = IntCounter::new(
        "price_points_saved_total",
        "Price points persisted by the ingestion cycle"
    ).expect("valid metric definition");

    pub static ref DIGESTS_SENT: IntCounter = IntCounter::new(
        "digests_sent_total",
        "Digests delivered and marked as sent"
    ).expect("valid metric definition");

    pub static ref DELIVERY_FAILURES: IntCounter = IntCounter::new(
        "digest_delivery_failures_total",
        "Digest deliveries rejected by the notifier"
    ).expect("valid metric definition");

    pub static ref MARK_SENT_FAILURES: IntCounter = IntCounter::new(
        "digest_mark_sent_failures_total",
        "Delivered digests whose bookkeeping write failed"
    ).expect("valid metric definition");
}

pub fn init() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(TICKS.clone()))?;
    REGISTRY.register(Box::new(TICK_FAILURES.clone()))?;
    REGISTRY.register(Box::new(POINTS_SAVED.clone()))?;
    REGISTRY.register(Box::new(DIGESTS_SENT.clone()))?;
    REGISTRY.register(Box::new(DELIVERY_FAILURES.clone()))?;
    REGISTRY.register(Box::new(MARK_SENT_FAILURES.clone()))?;
    Ok(())
}

/// Renders the registry in the prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
