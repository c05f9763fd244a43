use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: engine operations. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "mentorbook_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "mentorbook_operation_duration_seconds";

/// Counter: accepts rejected because the window overlaps an accepted booking.
pub const CONFLICTS_TOTAL: &str = "mentorbook_conflicts_total";

// ── State ───────────────────────────────────────────────────────

/// Gauge: bookings held, by status. Set on recovery.
pub const BOOKINGS: &str = "mentorbook_bookings";

/// Histogram: journal append + fsync duration in seconds.
pub const WAL_APPEND_DURATION_SECONDS: &str = "mentorbook_wal_append_duration_seconds";

/// Counter: journal compactions performed.
pub const WAL_COMPACTIONS_TOTAL: &str = "mentorbook_wal_compactions_total";

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

/// Short label for an outcome, used as the `status` metric label.
pub fn outcome_label<T>(result: &Result<T, EngineError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::InvalidArgument(_)) => "invalid_argument",
        Err(EngineError::PermissionDenied { .. }) => "permission_denied",
        Err(EngineError::InvalidTransition { .. } | EngineError::StillScheduled(_)) => {
            "invalid_transition"
        }
        Err(EngineError::Conflict { .. }) => "conflict",
        Err(EngineError::LimitExceeded(_)) => "limit_exceeded",
        Err(EngineError::WalError(_)) => "wal_error",
    }
}

/// Record count and latency for one finished operation.
pub fn record<T>(operation: &'static str, started: Instant, result: &Result<T, EngineError>) {
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => outcome_label(result))
        .increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
