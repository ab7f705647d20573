pub mod batch;
pub mod daily_roi;
pub mod monthly_salary;
pub mod scheduler;
pub mod weekly_bonus;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use futures_util::FutureExt;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::finance::CommissionPolicy;

pub use scheduler::{Clock, JobFn, JobScheduler, SystemClock, Trigger};

/// Outcome of one job run, for logs and the admin API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job: &'static str,
    /// Local date, week start or month the run covered.
    pub period: String,
    pub payouts: usize,
    pub amount: Decimal,
    /// True when the period had already been paid and nothing was written.
    pub skipped: bool,
}

impl JobSummary {
    pub fn skipped(job: &'static str, period: String) -> Self {
        Self {
            job,
            period,
            payouts: 0,
            amount: Decimal::ZERO,
            skipped: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    DailyRoi,
    WeeklyBonus,
    MonthlySalary,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DailyRoi => daily_roi::JOB,
            JobKind::WeeklyBonus => weekly_bonus::JOB,
            JobKind::MonthlySalary => monthly_salary::JOB,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            daily_roi::JOB => Some(JobKind::DailyRoi),
            weekly_bonus::JOB => Some(JobKind::WeeklyBonus),
            monthly_salary::JOB => Some(JobKind::MonthlySalary),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What every job run needs.
#[derive(Clone)]
pub struct JobContext {
    pub pool: PgPool,
    pub policy: Arc<CommissionPolicy>,
    /// Canonical local timezone for period keys.
    pub offset: FixedOffset,
}

impl JobContext {
    /// Run a job as of `now`, recording duration and payout metrics.
    pub async fn run(&self, kind: JobKind, now: DateTime<Utc>) -> anyhow::Result<JobSummary> {
        let started = Instant::now();
        tracing::info!(job = %kind, now = %now, "Payout job started");

        let summary = match kind {
            JobKind::DailyRoi => {
                daily_roi::run_daily_roi_and_level_income(&self.pool, &self.policy, self.offset, now)
                    .await?
            }
            JobKind::WeeklyBonus => {
                weekly_bonus::run_weekly_bonus(&self.pool, &self.policy, self.offset, now).await?
            }
            JobKind::MonthlySalary => {
                monthly_salary::run_monthly_salary(&self.pool, &self.policy, self.offset, now).await?
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        histogram!("job_duration_seconds", "job" => kind.as_str()).record(elapsed);
        counter!("payouts_posted", "job" => kind.as_str()).increment(summary.payouts as u64);

        tracing::info!(
            job = %kind,
            period = %summary.period,
            payouts = summary.payouts,
            amount = %summary.amount,
            skipped = summary.skipped,
            elapsed_secs = elapsed,
            "Payout job finished"
        );

        Ok(summary)
    }

    /// A scheduler job body that runs `kind` with this context.
    pub fn job_fn(&self, kind: JobKind) -> JobFn {
        let ctx = self.clone();
        Arc::new(move |now: DateTime<Utc>| {
            let ctx = ctx.clone();
            async move { ctx.run(kind, now).await }.boxed()
        })
    }
}

// ---------------------------------------------------------------------------
// Periods in the canonical local timezone
// ---------------------------------------------------------------------------

pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Sunday 00:00 local of the week containing `now`.
pub fn week_start(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    let date = local_date(now, offset);
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// `YYYY-MM` of `now` in local time.
pub fn month_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    let date = local_date(now, offset);
    format!("{:04}-{:02}", date.year(), date.month())
}
