mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use referral_ledger::db::{investment_repo, payout_run_repo, tracking_repo, transaction_repo, user_repo};
use referral_ledger::finance::roi_band::to_cents;
use referral_ledger::finance::{reconcile_user, CommissionPolicy};
use referral_ledger::jobs::daily_roi::run_daily_roi_and_level_income;
use referral_ledger::jobs::monthly_salary::run_monthly_salary;
use referral_ledger::jobs::weekly_bonus::{record_weekly_eligibility, run_weekly_bonus};
use referral_ledger::jobs::{JobContext, JobKind};
use referral_ledger::models::{RelatedEntity, TrackingStatus, TransactionType, User};

fn utc0() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Wednesday 2026-10-14 01:00 UTC; its week starts Sunday 2026-10-11.
fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 1, 0, 0).unwrap()
}

async fn balances(pool: &sqlx::PgPool, users: &[User]) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(common::balance(pool, user.id).await);
    }
    out
}

async fn assert_reconciled(pool: &sqlx::PgPool, users: &[User]) {
    for user in users {
        let rec = reconcile_user(pool, user.id).await.unwrap();
        assert!(rec.is_consistent(), "drift for {}: {}", user.id, rec.drift());
    }
}

// ---------------------------------------------------------------------------
// Daily ROI + level income
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_daily_roi_cascades_seven_levels() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let users = common::seed_chain(&pool, 9).await;
    common::invest(&pool, &users[8], 1000).await;
    let before = balances(&pool, &users).await;

    let summary = run_daily_roi_and_level_income(&pool, &policy, utc0(), wednesday())
        .await
        .unwrap();
    assert!(!summary.skipped);
    assert_eq!(summary.period, "2026-10-14");
    assert_eq!(summary.payouts, 8);

    let investment = investment_repo::get_user_investments(&pool, users[8].id)
        .await
        .unwrap()
        .remove(0);
    let related = transaction_repo::get_related_transactions(&pool, RelatedEntity::Investment(investment.id))
        .await
        .unwrap();
    let roi = related
        .iter()
        .find(|t| t.txn_type == TransactionType::RoiPayout)
        .expect("roi payout")
        .amount;

    // 1-3% of 1000
    assert!(roi >= Decimal::from(10) && roi <= Decimal::from(30), "roi {roi}");
    assert_eq!(investment.total_roi_earned, roi);

    let after = balances(&pool, &users).await;
    assert_eq!(after[8] - before[8], roi);
    for (level, rate) in policy.level_rates.iter().enumerate() {
        let upline = 7 - level;
        assert_eq!(after[upline] - before[upline], to_cents(roi * rate), "level {}", level + 1);
    }
    assert_eq!(after[0], before[0]);

    let level_entries = related
        .iter()
        .filter(|t| t.txn_type == TransactionType::LevelIncome)
        .count();
    assert_eq!(level_entries, 7);

    assert_reconciled(&pool, &users).await;
}

#[tokio::test]
async fn test_daily_roi_runs_once_per_local_day() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let users = common::seed_chain(&pool, 2).await;
    common::invest(&pool, &users[1], 500).await;

    run_daily_roi_and_level_income(&pool, &policy, utc0(), wednesday()).await.unwrap();
    let after_first = balances(&pool, &users).await;

    let again = run_daily_roi_and_level_income(&pool, &policy, utc0(), wednesday() + Duration::hours(20))
        .await
        .unwrap();
    assert!(again.skipped);
    assert_eq!(again.payouts, 0);
    assert_eq!(balances(&pool, &users).await, after_first);

    let run = payout_run_repo::get_run(&pool, "daily_roi", "2026-10-14").await.unwrap().unwrap();
    assert_eq!(run.payouts, 2);

    let next_day = run_daily_roi_and_level_income(&pool, &policy, utc0(), wednesday() + Duration::days(1))
        .await
        .unwrap();
    assert!(!next_day.skipped);
    assert!(balances(&pool, &users).await[1] > after_first[1]);

    assert_reconciled(&pool, &users).await;
}

// ---------------------------------------------------------------------------
// Weekly team bonus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_weekly_bonus_is_idempotent_within_a_week() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let root = common::seed_user(&pool, None).await;
    common::seed_user(&pool, Some(&root)).await;
    common::seed_user(&pool, Some(&root)).await;

    let summary = run_weekly_bonus(&pool, &policy, utc0(), wednesday()).await.unwrap();
    assert_eq!(summary.period, "2026-10-11");
    assert_eq!(summary.payouts, 1);
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(40));

    let again = run_weekly_bonus(&pool, &policy, utc0(), wednesday() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(again.payouts, 0);
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(40));

    // a new week pays again
    run_weekly_bonus(&pool, &policy, utc0(), wednesday() + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(80));

    assert_reconciled(&pool, &[root]).await;
}

#[tokio::test]
async fn test_weekly_bonus_top_up_pays_only_the_difference() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let root = common::seed_user(&pool, None).await;
    common::seed_user(&pool, Some(&root)).await;
    common::seed_user(&pool, Some(&root)).await;

    run_weekly_bonus(&pool, &policy, utc0(), wednesday()).await.unwrap();
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(40));

    common::seed_user(&pool, Some(&root)).await;
    let summary = run_weekly_bonus(&pool, &policy, utc0(), wednesday() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(summary.amount, Decimal::from(60));

    // 3 direct referrals earn 100 in total this week, not 140
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(100));

    let week = NaiveDate::from_ymd_opt(2026, 10, 11).unwrap();
    let record = tracking_repo::get_record(&pool, root.id, week).await.unwrap().unwrap();
    assert_eq!(record.status, TrackingStatus::Paid);
    assert_eq!(record.bonus_amount_eligible, Decimal::from(100));
    assert_eq!(record.referral_count, 3);

    assert_reconciled(&pool, &[root]).await;
}

#[tokio::test]
async fn test_pending_eligibility_is_paid_in_full() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let root = common::seed_user(&pool, None).await;
    for _ in 0..3 {
        common::seed_user(&pool, Some(&root)).await;
    }

    let pending = record_weekly_eligibility(&pool, &policy, root.id, utc0(), wednesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, TrackingStatus::Pending);
    assert_eq!(pending.bonus_amount_eligible, Decimal::from(100));
    assert_eq!(common::balance(&pool, root.id).await, Decimal::ZERO);

    run_weekly_bonus(&pool, &policy, utc0(), wednesday()).await.unwrap();
    assert_eq!(common::balance(&pool, root.id).await, Decimal::from(100));

    // the paid row is not reopened
    let record = record_weekly_eligibility(&pool, &policy, root.id, utc0(), wednesday())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, TrackingStatus::Paid);

    // a user without referrals has nothing to record
    let lonely = common::seed_user(&pool, None).await;
    assert!(record_weekly_eligibility(&pool, &policy, lonely.id, utc0(), wednesday())
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Monthly team salary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_monthly_salary_pays_team_tier_once_per_month() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let root = common::seed_user(&pool, None).await;
    let mut team = Vec::new();
    for _ in 0..5 {
        team.push(common::seed_user(&pool, Some(&root)).await);
    }
    common::invest(&pool, &team[0], 100).await;
    let root_before = common::balance(&pool, root.id).await;

    let summary = run_monthly_salary(&pool, &policy, utc0(), wednesday()).await.unwrap();
    assert_eq!(summary.period, "2026-10");
    assert_eq!(summary.payouts, 1);
    assert_eq!(common::balance(&pool, root.id).await - root_before, Decimal::from(11));

    let member = user_repo::get_user(&pool, team[0].id).await.unwrap().unwrap();
    assert_eq!(member.monthly_trade_count, 0);

    let again = run_monthly_salary(&pool, &policy, utc0(), wednesday() + Duration::days(3))
        .await
        .unwrap();
    assert!(again.skipped);
    assert_eq!(common::balance(&pool, root.id).await - root_before, Decimal::from(11));

    let mut everyone = team;
    everyone.push(root);
    assert_reconciled(&pool, &everyone).await;
}

#[tokio::test]
async fn test_admins_do_not_count_toward_team_size() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let policy = CommissionPolicy::default();
    let root = common::seed_user(&pool, None).await;
    for _ in 0..4 {
        common::seed_user(&pool, Some(&root)).await;
    }
    let admin = common::seed_admin(&pool).await;
    sqlx::query("UPDATE users SET referred_by = $1 WHERE id = $2")
        .bind(root.id)
        .bind(admin.id)
        .execute(&pool)
        .await
        .unwrap();

    let summary = run_monthly_salary(&pool, &policy, utc0(), wednesday()).await.unwrap();
    assert_eq!(summary.payouts, 0);
    assert_eq!(common::balance(&pool, root.id).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_job_context_runs_by_kind() {
    let Some((pool, _guard)) = common::fresh_db().await else {
        return;
    };
    let ctx = JobContext {
        pool: pool.clone(),
        policy: Arc::new(CommissionPolicy::default()),
        offset: utc0(),
    };

    let first = ctx.run(JobKind::MonthlySalary, wednesday()).await.unwrap();
    assert_eq!(first.job, "monthly_salary");
    assert!(!first.skipped);

    let second = ctx.run(JobKind::MonthlySalary, wednesday()).await.unwrap();
    assert!(second.skipped);
}
