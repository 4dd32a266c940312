use std::net::SocketAddr;

/// Counter: bookings saved (create or edit). Labels: kind.
pub const BOOKINGS_SAVED_TOTAL: &str = "stadeplan_bookings_saved_total";

/// Histogram: concrete instances produced by one save.
pub const INSTANCES_CREATED: &str = "stadeplan_instances_created";

/// Counter: confirmed deletions. Labels: scope.
pub const DELETIONS_TOTAL: &str = "stadeplan_deletions_total";

/// Counter: saves refused because of an overlap.
pub const OVERLAPS_REJECTED_TOTAL: &str = "stadeplan_overlaps_rejected_total";

/// Gauge: events in the store after the last commit or reload.
pub const STORE_EVENTS: &str = "stadeplan_store_events";

/// Histogram: wholesale commit duration in seconds.
pub const COMMIT_DURATION_SECONDS: &str = "stadeplan_commit_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::warn!("metrics exporter not installed: {e}"),
    }
}
