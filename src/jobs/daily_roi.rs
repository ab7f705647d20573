use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{investment_repo, payout_run_repo};
use crate::finance::policy::{CommissionPolicy, LEVEL_DEPTH};
use crate::finance::roi_band::{sample_daily_rate, to_cents, RoiBand};
use crate::models::{Investment, RelatedEntity, TransactionType};
use crate::referral::{traversal, GraphSnapshot, ReferralGraph};

use super::batch::PayoutBatch;
use super::{local_date, JobSummary};

pub const JOB: &str = "daily_roi";

/// The day's payouts, computed but not yet written.
#[derive(Debug, Default)]
pub struct DailyPlan {
    pub batch: PayoutBatch,
    /// Per-investment ROI to add to `total_roi_earned`.
    pub roi_earned: Vec<(Uuid, Decimal)>,
    pub level_payouts: usize,
}

/// Compute ROI for each investment and the level income it cascades upward.
///
/// The rate comes from the band frozen on the investment. Level k (1-based)
/// of the owner's upline receives `roi * level_rates[k - 1]`.
pub async fn plan_daily_payouts<G, F>(
    policy: &CommissionPolicy,
    investments: &[Investment],
    graph: &G,
    mut sample_rate: F,
) -> anyhow::Result<DailyPlan>
where
    G: ReferralGraph + ?Sized,
    F: FnMut(&RoiBand) -> Decimal,
{
    let mut plan = DailyPlan::default();
    let mut uplines: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

    for investment in investments {
        let rate = sample_rate(&investment.roi_band());
        let roi = to_cents(investment.amount * rate);
        if roi <= Decimal::ZERO {
            continue;
        }

        let link = Some(RelatedEntity::Investment(investment.id));
        plan.roi_earned.push((investment.id, roi));
        plan.batch
            .credit(investment.user_id, TransactionType::RoiPayout, roi, link);

        let chain = match uplines.get(&investment.user_id) {
            Some(chain) => chain.clone(),
            None => {
                let chain = traversal::upline(graph, investment.user_id, LEVEL_DEPTH).await?;
                uplines.insert(investment.user_id, chain.clone());
                chain
            }
        };

        for (upline_user, rate) in chain.iter().zip(policy.level_rates.iter()) {
            let income = to_cents(roi * rate);
            if plan
                .batch
                .credit(*upline_user, TransactionType::LevelIncome, income, link)
            {
                plan.level_payouts += 1;
            }
        }
    }

    Ok(plan)
}

/// Pay one day of ROI plus level income to every active investment.
///
/// Guarded by the local date: a second run the same day writes nothing.
/// All effects commit together.
pub async fn run_daily_roi_and_level_income(
    pool: &PgPool,
    policy: &CommissionPolicy,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> anyhow::Result<JobSummary> {
    let period = local_date(now, offset).format("%Y-%m-%d").to_string();

    let mut tx = pool.begin().await?;

    payout_run_repo::lock_job(&mut *tx, JOB).await?;
    let Some(run_id) = payout_run_repo::claim_run(&mut *tx, JOB, &period).await? else {
        tracing::info!(period = %period, "Daily ROI already paid for this date, skipping");
        return Ok(JobSummary::skipped(JOB, period));
    };

    let investments = investment_repo::get_active_investments(&mut *tx, policy.min_investment).await?;
    let graph = GraphSnapshot::load(&mut *tx).await?;

    let mut rng = StdRng::from_entropy();
    let plan = plan_daily_payouts(policy, &investments, &graph, |band| {
        sample_daily_rate(band, &mut rng)
    })
    .await?;

    investment_repo::bulk_add_roi_earned(&mut *tx, &plan.roi_earned).await?;
    plan.batch.flush(&mut *tx, now).await?;
    payout_run_repo::finish_run(
        &mut *tx,
        run_id,
        i32::try_from(plan.batch.len()).unwrap_or(i32::MAX),
        plan.batch.total(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        period = %period,
        investments = investments.len(),
        roi_payouts = plan.roi_earned.len(),
        level_payouts = plan.level_payouts,
        "Daily ROI posted"
    );

    Ok(JobSummary {
        job: JOB,
        period,
        payouts: plan.batch.len(),
        amount: plan.batch.total(),
        skipped: false,
    })
}
