//! Prometheus metrics initialization.
//!
//! Installs one global recorder for the process; the `/metrics` handler
//! renders the same handle on every scrape rather than re-installing a
//! recorder per request.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("installing the process-wide Prometheus recorder should only happen once")
}
