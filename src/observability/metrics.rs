//! Metrics collection.
//!
//! Prometheus-compatible counters behind the `metrics` facade. Without an
//! installed recorder every call is a no-op, so library code records
//! unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::EopError;
use crate::model::MergeReport;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Route labels; anything else is bucketed as `"__unknown__"`.
const KNOWN_ROUTES: [&str; 4] = ["create", "model", "download", "players"];

/// Sanitizes a route name for use as a metrics label.
#[must_use]
pub fn sanitize_route_label(route: &str) -> &str {
    if KNOWN_ROUTES.contains(&route) {
        route
    } else {
        "__unknown__"
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `EopError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), EopError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| EopError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("eop_sessions_created_total", "Sessions created");
    describe_counter!("eop_players_enrolled_total", "Players enrolled");
    describe_counter!("eop_exports_total", "Threat model exports assembled");
    describe_counter!(
        "eop_threats_merged_total",
        "Identified threats merged into exported models"
    );
    describe_counter!(
        "eop_threats_dropped_total",
        "Identified threats that could not be placed in the model"
    );
    describe_counter!("eop_http_requests_total", "API requests by route and status");
    describe_counter!("eop_errors_total", "Errors by category");
}

/// Records a completed session creation.
pub fn record_session_created() {
    counter!("eop_sessions_created_total").increment(1);
}

/// Records one successful enrollment.
pub fn record_player_enrolled() {
    counter!("eop_players_enrolled_total").increment(1);
}

/// Records an assembled export and its merge outcome.
pub fn record_export(report: &MergeReport) {
    counter!("eop_exports_total").increment(1);
    counter!("eop_threats_merged_total").increment(report.appended as u64);
    if report.unresolved_components > 0 {
        counter!("eop_threats_dropped_total", "reason" => "unresolved_component")
            .increment(report.unresolved_components as u64);
    }
    if report.skipped_diagrams > 0 {
        counter!("eop_threats_dropped_total", "reason" => "unresolved_diagram")
            .increment(report.skipped_diagrams as u64);
    }
    if report.skipped_entries > 0 {
        counter!("eop_threats_dropped_total", "reason" => "malformed_entry")
            .increment(report.skipped_entries as u64);
    }
}

/// Records an API request outcome.
pub fn record_http_request(route: &str, status: u16) {
    counter!(
        "eop_http_requests_total",
        "route" => sanitize_route_label(route).to_owned(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Records an error by category.
pub fn record_error(category: &'static str) {
    counter!("eop_errors_total", "category" => category).increment(1);
}
