use std::sync::{Mutex, OnceLock};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const JOBS: [&str; 3] = ["daily_roi", "weekly_bonus", "monthly_salary"];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL: Mutex<()> = Mutex::new(());

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload. Later calls reuse the installed recorder.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let _installing = INSTALL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("users_registered").absolute(0);
    counter!("investments_created").absolute(0);
    counter!("withdrawals_requested").absolute(0);
    counter!("withdrawals_approved").absolute(0);
    counter!("withdrawals_rejected").absolute(0);

    for job in JOBS {
        counter!("payouts_posted", "job" => job).absolute(0);
        histogram!("job_duration_seconds", "job" => job).record(0.0);
    }

    Ok(HANDLE.get_or_init(|| handle).clone())
}
