//! Prometheus metrics for entitlement operations.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "entitlement_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Activation code redemptions by outcome
pub static ACTIVATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "entitlement_activations_total",
        "Activation code redemption attempts",
        &["outcome"]
    )
    .expect("Failed to register ACTIVATIONS_TOTAL")
});

/// Webhook reconciliations by applied status
pub static WEBHOOKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "entitlement_webhooks_total",
        "Payment webhook reconciliations",
        &["applied_status"]
    )
    .expect("Failed to register WEBHOOKS_TOTAL")
});

/// Checkout initiations by outcome
pub static CHECKOUTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "entitlement_checkouts_total",
        "Provider checkout initiations",
        &["outcome"]
    )
    .expect("Failed to register CHECKOUTS_TOTAL")
});

/// Register all metrics up front so they appear in scrapes before first use.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ACTIVATIONS_TOTAL);
    Lazy::force(&WEBHOOKS_TOTAL);
    Lazy::force(&CHECKOUTS_TOTAL);
}

/// Render all registered metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
