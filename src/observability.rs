use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total operations served. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "seatdesk_requests_total";

/// Histogram: operation latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "seatdesk_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: seats booked.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "seatdesk_bookings_confirmed_total";

/// Counter: expired locks removed by the reaper.
pub const LOCKS_REAPED_TOTAL: &str = "seatdesk_locks_reaped_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "seatdesk_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "seatdesk_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "seatdesk_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record one served operation.
pub fn record_request(op: &'static str, status: &'static str, elapsed: std::time::Duration) {
    metrics::counter!(REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "op" => op).record(elapsed.as_secs_f64());
}
