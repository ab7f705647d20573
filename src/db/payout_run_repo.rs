use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::PayoutRun;

/// Claim `(job, period_key)`. Returns the run id, or `None` if that period
/// already ran. Inside a transaction the claim is released on rollback.
pub async fn claim_run(
    db: impl PgExecutor<'_>,
    job: &str,
    period_key: &str,
) -> sqlx::Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO payout_runs (job, period_key)
        VALUES ($1, $2)
        ON CONFLICT (job, period_key) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(job)
    .bind(period_key)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| r.0))
}

pub async fn finish_run(
    db: impl PgExecutor<'_>,
    run_id: Uuid,
    payouts: i32,
    total_amount: Decimal,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE payout_runs SET payouts = $2, total_amount = $3 WHERE id = $1")
        .bind(run_id)
        .bind(payouts)
        .bind(total_amount)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn get_run(
    db: impl PgExecutor<'_>,
    job: &str,
    period_key: &str,
) -> sqlx::Result<Option<PayoutRun>> {
    sqlx::query_as::<_, PayoutRun>("SELECT * FROM payout_runs WHERE job = $1 AND period_key = $2")
        .bind(job)
        .bind(period_key)
        .fetch_optional(db)
        .await
}

/// Serialize runs of one job across processes for the rest of the
/// surrounding transaction.
pub async fn lock_job(db: impl PgExecutor<'_>, job: &str) -> sqlx::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(job)
        .execute(db)
        .await?;

    Ok(())
}
