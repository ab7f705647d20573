pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod finance;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod referral;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::finance::CommissionPolicy;
use crate::jobs::JobContext;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub policy: Arc<CommissionPolicy>,
    pub jobs: JobContext,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        config: AppConfig,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> anyhow::Result<Self> {
        let policy = Arc::new(CommissionPolicy::default().with_registration_bonus(config.registration_bonus));
        let jobs = JobContext {
            pool: db.clone(),
            policy: Arc::clone(&policy),
            offset: config.job_offset()?,
        };

        Ok(Self {
            db,
            config,
            policy,
            jobs,
            metrics_handle,
        })
    }
}
