use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::finance::roi_band::RoiBand;
use crate::models::Investment;

/// Insert an active investment with its ROI band frozen.
pub async fn insert_investment(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    amount: Decimal,
    band: RoiBand,
    start_date: DateTime<Utc>,
) -> sqlx::Result<Investment> {
    sqlx::query_as::<_, Investment>(
        r#"
        INSERT INTO investments (user_id, amount, start_date, roi_percentage_min, roi_percentage_max, status)
        VALUES ($1, $2, $3, $4, $5, 'active')
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(start_date)
    .bind(band.min_pct)
    .bind(band.max_pct)
    .fetch_one(db)
    .await
}

pub async fn get_investment(db: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Investment>> {
    sqlx::query_as::<_, Investment>("SELECT * FROM investments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Active investments at or above `min_amount`, oldest first.
pub async fn get_active_investments(
    db: impl PgExecutor<'_>,
    min_amount: Decimal,
) -> sqlx::Result<Vec<Investment>> {
    sqlx::query_as::<_, Investment>(
        r#"
        SELECT * FROM investments
        WHERE status = 'active' AND amount >= $1
        ORDER BY start_date, id
        "#,
    )
    .bind(min_amount)
    .fetch_all(db)
    .await
}

pub async fn get_user_investments(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Investment>> {
    sqlx::query_as::<_, Investment>(
        "SELECT * FROM investments WHERE user_id = $1 ORDER BY start_date DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Add earned ROI to many investments in one statement.
pub async fn bulk_add_roi_earned(
    db: impl PgExecutor<'_>,
    earned: &[(Uuid, Decimal)],
) -> sqlx::Result<u64> {
    if earned.is_empty() {
        return Ok(0);
    }

    let (ids, amounts): (Vec<Uuid>, Vec<Decimal>) = earned.iter().copied().unzip();

    let result = sqlx::query(
        r#"
        UPDATE investments AS i
        SET total_roi_earned = i.total_roi_earned + d.roi
        FROM UNNEST($1::uuid[], $2::numeric[]) AS d(id, roi)
        WHERE i.id = d.id
        "#,
    )
    .bind(ids)
    .bind(amounts)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}
