//! Prometheus metrics for the invitations worker.
//!
//! Every handled stream message ends up in `invitation_jobs_total` with one
//! of the outcomes below. Dispatched jobs also add their invited and skipped
//! counts to `invitations_sent_total` and `invitations_skipped_total`.

use domain_invitations::DispatchSummary;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub const OUTCOME_DISPATCHED: &str = "dispatched";
pub const OUTCOME_NOT_INVITABLE: &str = "not_invitable";
pub const OUTCOME_ALREADY_PROCESSED: &str = "already_processed";
pub const OUTCOME_FAILED: &str = "failed";
pub const OUTCOME_UNPARSEABLE: &str = "unparseable";

/// Install the global Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok(handle)
    })
}

pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Job counters labelled by stream and dispatch method.
#[derive(Debug, Clone)]
pub struct JobMetrics {
    stream_name: String,
}

impl JobMetrics {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
        }
    }

    fn job_finished(&self, method: &'static str, outcome: &'static str) {
        counter!(
            "invitation_jobs_total",
            "stream" => self.stream_name.clone(),
            "method" => method,
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn job_dispatched(&self, method: &'static str, summary: &DispatchSummary, duration: Duration) {
        self.job_finished(method, OUTCOME_DISPATCHED);

        counter!("invitations_sent_total", "method" => method).increment(summary.invited as u64);
        counter!("invitations_skipped_total", "method" => method).increment(summary.skipped as u64);

        histogram!("invitation_job_duration_seconds", "method" => method)
            .record(duration.as_secs_f64());
    }

    pub fn job_not_invitable(&self, method: &'static str) {
        self.job_finished(method, OUTCOME_NOT_INVITABLE);
    }

    pub fn job_already_processed(&self, method: &'static str) {
        self.job_finished(method, OUTCOME_ALREADY_PROCESSED);
    }

    pub fn job_failed(&self, method: &'static str, duration: Duration) {
        self.job_finished(method, OUTCOME_FAILED);

        histogram!("invitation_job_duration_seconds", "method" => method)
            .record(duration.as_secs_f64());
    }

    /// Entry without a readable `job` field. There is no method to label it with.
    pub fn job_unparseable(&self) {
        self.job_finished("unknown", OUTCOME_UNPARSEABLE);
    }
}
