use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"]
    ).expect("metric can be created");

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method", "path"]
    ).expect("metric can be created");

    // Business metrics - lending specific
    pub static ref TRANSACTIONS_ADMITTED: IntCounterVec = IntCounterVec::new(
        Opts::new("transactions_admitted_total", "Transactions admitted against a credit limit"),
        &["tenor"]
    ).expect("metric can be created");

    pub static ref TRANSACTIONS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("transactions_rejected_total", "Transactions refused by admission"),
        &["reason"]
    ).expect("metric can be created");

    pub static ref CREDIT_LIMITS_CREATED: IntCounter = IntCounter::new(
        "credit_limits_created_total",
        "Credit limits created or replaced"
    ).expect("metric can be created");

    pub static ref CONSUMERS_REGISTERED: IntCounter = IntCounter::new(
        "consumers_registered_total",
        "Consumers registered"
    ).expect("metric can be created");

    pub static ref AVAILABILITY_CHECKS: IntCounter = IntCounter::new(
        "availability_checks_total",
        "Credit limit availability lookups"
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), Box<dyn std::error::Error>> {
    // HTTP metrics
    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;

    // Business metrics
    registry.register(Box::new(TRANSACTIONS_ADMITTED.clone()))?;
    registry.register(Box::new(TRANSACTIONS_REJECTED.clone()))?;
    registry.register(Box::new(CREDIT_LIMITS_CREATED.clone()))?;
    registry.register(Box::new(CONSUMERS_REGISTERED.clone()))?;
    registry.register(Box::new(AVAILABILITY_CHECKS.clone()))?;

    Ok(())
}

/// Generate metrics output in Prometheus text format
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
