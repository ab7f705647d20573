use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::WeeklyBonusTracking;

/// A tracking row to be marked paid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaidWeek {
    pub user_id: Uuid,
    pub referral_count: i32,
    pub bonus_amount: Decimal,
}

/// All tracking rows for a canonical week.
pub async fn get_week_records(
    db: impl PgExecutor<'_>,
    week_start: NaiveDate,
) -> sqlx::Result<Vec<WeeklyBonusTracking>> {
    sqlx::query_as::<_, WeeklyBonusTracking>(
        "SELECT * FROM weekly_bonus_tracking WHERE week_start = $1",
    )
    .bind(week_start)
    .fetch_all(db)
    .await
}

pub async fn get_record(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    week_start: NaiveDate,
) -> sqlx::Result<Option<WeeklyBonusTracking>> {
    sqlx::query_as::<_, WeeklyBonusTracking>(
        "SELECT * FROM weekly_bonus_tracking WHERE user_id = $1 AND week_start = $2",
    )
    .bind(user_id)
    .bind(week_start)
    .fetch_optional(db)
    .await
}

/// Upsert-by-(user, week) many rows as paid.
pub async fn upsert_paid(
    db: impl PgExecutor<'_>,
    week_start: NaiveDate,
    rows: &[PaidWeek],
    paid_at: DateTime<Utc>,
) -> sqlx::Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let user_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
    let counts: Vec<i32> = rows.iter().map(|r| r.referral_count).collect();
    let amounts: Vec<Decimal> = rows.iter().map(|r| r.bonus_amount).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO weekly_bonus_tracking
            (user_id, week_start, referral_count, bonus_amount_eligible, status, paid_at)
        SELECT d.user_id, $1, d.referral_count, d.amount, 'paid'::tracking_status, $2
        FROM UNNEST($3::uuid[], $4::int4[], $5::numeric[]) AS d(user_id, referral_count, amount)
        ON CONFLICT (user_id, week_start) DO UPDATE
            SET referral_count = EXCLUDED.referral_count,
                bonus_amount_eligible = EXCLUDED.bonus_amount_eligible,
                status = 'paid',
                paid_at = EXCLUDED.paid_at
        "#,
    )
    .bind(week_start)
    .bind(paid_at)
    .bind(user_ids)
    .bind(counts)
    .bind(amounts)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Record (or refresh) a not-yet-paid eligibility. A paid row is left untouched.
pub async fn upsert_pending(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    week_start: NaiveDate,
    referral_count: i32,
    bonus_amount: Decimal,
) -> sqlx::Result<Option<WeeklyBonusTracking>> {
    sqlx::query_as::<_, WeeklyBonusTracking>(
        r#"
        INSERT INTO weekly_bonus_tracking
            (user_id, week_start, referral_count, bonus_amount_eligible, status)
        VALUES ($1, $2, $3, $4, 'pending')
        ON CONFLICT (user_id, week_start) DO UPDATE
            SET referral_count = EXCLUDED.referral_count,
                bonus_amount_eligible = EXCLUDED.bonus_amount_eligible
            WHERE weekly_bonus_tracking.status = 'pending'
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(week_start)
    .bind(referral_count)
    .bind(bonus_amount)
    .fetch_optional(db)
    .await
}
