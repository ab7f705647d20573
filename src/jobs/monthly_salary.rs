use chrono::{DateTime, FixedOffset, Utc};
use sqlx::PgPool;

use crate::db::{payout_run_repo, user_repo};
use crate::finance::CommissionPolicy;
use crate::models::TransactionType;
use crate::referral::{all_downline_users, GraphSnapshot};

use super::batch::PayoutBatch;
use super::{month_key, JobSummary};

pub const JOB: &str = "monthly_salary";

/// One salary per user whose whole team reaches a tier.
pub async fn plan_monthly_salaries(
    policy: &CommissionPolicy,
    graph: &GraphSnapshot,
) -> anyhow::Result<PayoutBatch> {
    let mut batch = PayoutBatch::new();

    for &user_id in graph.users() {
        let team_size = all_downline_users(graph, user_id).await?.len() as u64;
        if let Some(salary) = policy.monthly_salary_for(team_size) {
            batch.credit(user_id, TransactionType::MonthlySalary, salary, None);
        }
    }

    Ok(batch)
}

/// Pay the monthly team salary once per local calendar month and reset
/// every user's monthly trade counter.
pub async fn run_monthly_salary(
    pool: &PgPool,
    policy: &CommissionPolicy,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> anyhow::Result<JobSummary> {
    let period = month_key(now, offset);

    let mut tx = pool.begin().await?;

    payout_run_repo::lock_job(&mut *tx, JOB).await?;
    let Some(run_id) = payout_run_repo::claim_run(&mut *tx, JOB, &period).await? else {
        tracing::info!(period = %period, "Monthly salary already paid for this month, skipping");
        return Ok(JobSummary::skipped(JOB, period));
    };

    let graph = GraphSnapshot::load(&mut *tx).await?;
    let batch = plan_monthly_salaries(policy, &graph).await?;

    batch.flush(&mut *tx, now).await?;
    let reset = user_repo::reset_monthly_trade_counts(&mut *tx).await?;
    payout_run_repo::finish_run(
        &mut *tx,
        run_id,
        i32::try_from(batch.len()).unwrap_or(i32::MAX),
        batch.total(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        period = %period,
        users = graph.len(),
        payouts = batch.len(),
        amount = %batch.total(),
        trade_counts_reset = reset,
        "Monthly salary posted"
    );

    Ok(JobSummary {
        job: JOB,
        period,
        payouts: batch.len(),
        amount: batch.total(),
        skipped: false,
    })
}
