//! Metrics for the QR asset service.
//!
//! Counters are emitted with the `metrics` macros where the work happens;
//! this module describes them and installs the Prometheus recorder that
//! `GET /metrics` renders.

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the global Prometheus recorder and describes all metrics.
///
/// Fails if a recorder has already been installed in this process.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Registers metric descriptions.
pub fn describe_metrics() {
    describe_counter!(
        "asset_reconcile_total",
        "Total number of asset updates reconciled"
    );
    describe_counter!(
        "asset_history_inserted_total",
        "Total number of asset history entries appended"
    );
    describe_counter!(
        "asset_history_patched_total",
        "Total number of in-place note or audit flag patches"
    );
    describe_counter!("qr_generated_total", "Total number of QR codes generated");
    describe_counter!(
        "attachment_uploaded_total",
        "Total number of attachment files stored"
    );

    describe_gauge!(
        "qa_db_pool_size",
        "Current number of connections in the database pool"
    );
    describe_gauge!(
        "qa_db_pool_idle",
        "Number of idle connections in the database pool"
    );
}

/// Records database pool statistics.
pub fn record_db_pool(size: u32, idle: usize) {
    gauge!("qa_db_pool_size").set(size as f64);
    gauge!("qa_db_pool_idle").set(idle as f64);
}
