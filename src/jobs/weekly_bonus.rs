use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::tracking_repo::{self, PaidWeek};
use crate::db::{payout_run_repo, user_repo};
use crate::errors::{LedgerError, LedgerResult};
use crate::finance::CommissionPolicy;
use crate::models::{TrackingStatus, TransactionType, WeeklyBonusTracking};

use super::batch::PayoutBatch;
use super::{week_start, JobSummary};

pub const JOB: &str = "weekly_bonus";

/// How much to pay this week given what the tracking row already says.
///
/// | previous            | eligible vs previous | pay              |
/// |---------------------|----------------------|------------------|
/// | none                | any                  | eligible         |
/// | pending             | any                  | eligible         |
/// | paid                | higher               | eligible - paid  |
/// | paid                | equal or lower       | nothing          |
pub fn weekly_payment(previous: Option<(TrackingStatus, Decimal)>, eligible: Decimal) -> Option<Decimal> {
    match previous {
        None | Some((TrackingStatus::Pending, _)) => Some(eligible),
        Some((TrackingStatus::Paid, paid)) if eligible > paid => Some(eligible - paid),
        Some((TrackingStatus::Paid, _)) => None,
    }
}

#[derive(Debug, Default)]
pub struct WeeklyPlan {
    pub batch: PayoutBatch,
    /// Tracking rows to mark paid at the new eligible amount.
    pub paid: Vec<PaidWeek>,
}

/// Decide every user's weekly payment from their direct referral count and
/// this week's tracking rows.
pub fn plan_weekly_bonuses(
    policy: &CommissionPolicy,
    referral_counts: &[(Uuid, i64)],
    records: &HashMap<Uuid, (TrackingStatus, Decimal)>,
) -> WeeklyPlan {
    let mut plan = WeeklyPlan::default();

    for &(user_id, count) in referral_counts {
        let Some(eligible) = policy.weekly_bonus_for(count.max(0) as u64) else {
            continue;
        };
        let Some(payment) = weekly_payment(records.get(&user_id).copied(), eligible) else {
            continue;
        };

        plan.batch
            .credit(user_id, TransactionType::WeeklyBonus, payment, None);
        plan.paid.push(PaidWeek {
            user_id,
            referral_count: i32::try_from(count).unwrap_or(i32::MAX),
            bonus_amount: eligible,
        });
    }

    plan
}

/// Pay the weekly team bonus for the canonical week containing `now`.
///
/// Safe to re-run within a week: unchanged eligibility pays nothing, grown
/// eligibility pays only the difference.
pub async fn run_weekly_bonus(
    pool: &PgPool,
    policy: &CommissionPolicy,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> anyhow::Result<JobSummary> {
    let week = week_start(now, offset);
    let period = week.format("%Y-%m-%d").to_string();

    let mut tx = pool.begin().await?;
    payout_run_repo::lock_job(&mut *tx, JOB).await?;

    let counts = user_repo::direct_referral_counts(&mut *tx).await?;
    let records: HashMap<Uuid, (TrackingStatus, Decimal)> = tracking_repo::get_week_records(&mut *tx, week)
        .await?
        .into_iter()
        .map(|r| (r.user_id, (r.status, r.bonus_amount_eligible)))
        .collect();

    let plan = plan_weekly_bonuses(policy, &counts, &records);

    tracking_repo::upsert_paid(&mut *tx, week, &plan.paid, now).await?;
    plan.batch.flush(&mut *tx, now).await?;

    tx.commit().await?;

    tracing::info!(
        week_start = %period,
        users = counts.len(),
        payouts = plan.batch.len(),
        amount = %plan.batch.total(),
        "Weekly bonus posted"
    );

    Ok(JobSummary {
        job: JOB,
        period,
        payouts: plan.batch.len(),
        amount: plan.batch.total(),
        skipped: false,
    })
}

/// Record a user's current weekly eligibility as `pending` for this week.
///
/// Returns the week's tracking row, or `None` when the user has not reached
/// the lowest tier. A row already paid is returned unchanged.
pub async fn record_weekly_eligibility(
    pool: &PgPool,
    policy: &CommissionPolicy,
    user_id: Uuid,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> LedgerResult<Option<WeeklyBonusTracking>> {
    let week: NaiveDate = week_start(now, offset);
    let mut tx = pool.begin().await?;

    if user_repo::get_user(&mut *tx, user_id).await?.is_none() {
        return Err(LedgerError::NotFound(format!("user {user_id}")));
    }

    let count = user_repo::count_direct_referrals(&mut *tx, user_id).await?;
    let Some(eligible) = policy.weekly_bonus_for(count.max(0) as u64) else {
        return Ok(None);
    };

    let record = match tracking_repo::upsert_pending(
        &mut *tx,
        user_id,
        week,
        i32::try_from(count).unwrap_or(i32::MAX),
        eligible,
    )
    .await?
    {
        Some(record) => record,
        None => tracking_repo::get_record(&mut *tx, user_id, week)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("weekly tracking for user {user_id}")))?,
    };

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        week_start = %week,
        referral_count = count,
        eligible = %eligible,
        status = ?record.status,
        "Weekly eligibility recorded"
    );

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_weekly_payment_decision_table() {
        assert_eq!(weekly_payment(None, dec(100)), Some(dec(100)));
        assert_eq!(
            weekly_payment(Some((TrackingStatus::Pending, dec(40))), dec(100)),
            Some(dec(100))
        );
        assert_eq!(
            weekly_payment(Some((TrackingStatus::Paid, dec(40))), dec(100)),
            Some(dec(60))
        );
        assert_eq!(weekly_payment(Some((TrackingStatus::Paid, dec(100))), dec(100)), None);
        assert_eq!(weekly_payment(Some((TrackingStatus::Paid, dec(250))), dec(100)), None);
    }

    #[test]
    fn test_plan_uses_highest_tier_met() {
        let policy = CommissionPolicy::default();
        let user = Uuid::new_v4();

        let plan = plan_weekly_bonuses(&policy, &[(user, 3)], &HashMap::new());
        assert_eq!(plan.batch.delta_for(user), dec(100));
        assert_eq!(
            plan.paid,
            vec![PaidWeek {
                user_id: user,
                referral_count: 3,
                bonus_amount: dec(100),
            }]
        );

        let plan = plan_weekly_bonuses(&policy, &[(user, 12)], &HashMap::new());
        assert_eq!(plan.batch.delta_for(user), dec(6000));
    }

    #[test]
    fn test_plan_skips_users_without_referrals() {
        let plan = plan_weekly_bonuses(&CommissionPolicy::default(), &[(Uuid::new_v4(), 0)], &HashMap::new());
        assert!(plan.batch.is_empty());
        assert!(plan.paid.is_empty());
    }

    #[test]
    fn test_rerun_with_unchanged_count_pays_nothing() {
        let user = Uuid::new_v4();
        let records = HashMap::from([(user, (TrackingStatus::Paid, dec(40)))]);

        let plan = plan_weekly_bonuses(&CommissionPolicy::default(), &[(user, 2)], &records);
        assert!(plan.batch.is_empty());
        assert!(plan.paid.is_empty());
    }

    #[test]
    fn test_top_up_pays_only_the_difference() {
        let user = Uuid::new_v4();
        // paid 40 for 2 referrals earlier this week, now has 3
        let records = HashMap::from([(user, (TrackingStatus::Paid, dec(40)))]);

        let plan = plan_weekly_bonuses(&CommissionPolicy::default(), &[(user, 3)], &records);
        assert_eq!(plan.batch.delta_for(user), dec(60));
        assert_eq!(plan.paid[0].bonus_amount, dec(100));
    }

    #[test]
    fn test_pending_record_is_paid_in_full() {
        let user = Uuid::new_v4();
        let records = HashMap::from([(user, (TrackingStatus::Pending, dec(100)))]);

        let plan = plan_weekly_bonuses(&CommissionPolicy::default(), &[(user, 3)], &records);
        assert_eq!(plan.batch.delta_for(user), dec(100));
    }
}
