use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Role, User, UserEdge};

// ---------------------------------------------------------------------------
// User CRUD
// ---------------------------------------------------------------------------

pub async fn insert_user(
    db: impl PgExecutor<'_>,
    email: &str,
    credential_hash: &str,
    role: Role,
    referral_code: &str,
    referred_by: Option<Uuid>,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, credential_hash, role, referral_code, referred_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(credential_hash)
    .bind(role)
    .bind(referral_code)
    .bind(referred_by)
    .fetch_one(db)
    .await
}

pub async fn get_user(db: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_referral_code(
    db: impl PgExecutor<'_>,
    code: &str,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(db)
        .await
}

pub async fn email_exists(db: impl PgExecutor<'_>, email: &str) -> sqlx::Result<bool> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(db)
        .await?;

    Ok(row.0)
}

// ---------------------------------------------------------------------------
// Wallet balance: atomic deltas only
// ---------------------------------------------------------------------------

/// Apply `delta` to a wallet and return the new balance (`None` if no such user).
pub async fn increment_balance(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    delta: Decimal,
) -> sqlx::Result<Option<Decimal>> {
    let row: Option<(Decimal,)> = sqlx::query_as(
        "UPDATE users SET wallet_balance = wallet_balance + $2 WHERE id = $1 RETURNING wallet_balance",
    )
    .bind(user_id)
    .bind(delta)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Debit `amount` only if the wallet covers it. Returns the new balance, or
/// `None` when the user is missing or the balance is short.
pub async fn debit_if_sufficient(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    amount: Decimal,
) -> sqlx::Result<Option<Decimal>> {
    let row: Option<(Decimal,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET wallet_balance = wallet_balance - $2
        WHERE id = $1 AND wallet_balance >= $2
        RETURNING wallet_balance
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Apply many wallet deltas in one statement. `deltas` must hold each user once.
pub async fn bulk_increment_balances(
    db: impl PgExecutor<'_>,
    deltas: &[(Uuid, Decimal)],
) -> sqlx::Result<u64> {
    if deltas.is_empty() {
        return Ok(0);
    }

    let (ids, amounts): (Vec<Uuid>, Vec<Decimal>) = deltas.iter().copied().unzip();

    let result = sqlx::query(
        r#"
        UPDATE users AS u
        SET wallet_balance = u.wallet_balance + d.delta
        FROM UNNEST($1::uuid[], $2::numeric[]) AS d(id, delta)
        WHERE u.id = d.id
        "#,
    )
    .bind(ids)
    .bind(amounts)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the cumulative principal and the monthly trade counter.
pub async fn record_investment_totals(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    amount: Decimal,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET total_investment = total_investment + $2,
            monthly_trade_count = monthly_trade_count + 1
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn reset_monthly_trade_counts(db: impl PgExecutor<'_>) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE users SET monthly_trade_count = 0 WHERE monthly_trade_count <> 0")
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Referral graph queries
// ---------------------------------------------------------------------------

/// Every user's single parent edge, for in-memory traversal by the jobs.
pub async fn load_edges(db: impl PgExecutor<'_>) -> sqlx::Result<Vec<UserEdge>> {
    sqlx::query_as::<_, UserEdge>("SELECT id, referred_by, role FROM users ORDER BY created_at, id")
        .fetch_all(db)
        .await
}

/// Children (role = user) of any id in `parents`, in one query.
pub async fn children_of(db: impl PgExecutor<'_>, parents: &[Uuid]) -> sqlx::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM users
        WHERE referred_by = ANY($1) AND role = 'user'
        ORDER BY created_at, id
        "#,
    )
    .bind(parents)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// The referrer of `user_id`, if it exists and has role = user.
pub async fn parent_of(db: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT p.id FROM users c
        INNER JOIN users p ON p.id = c.referred_by
        WHERE c.id = $1 AND p.role = 'user'
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Direct referrals of a user, in referral order.
pub async fn get_direct_referrals(db: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE referred_by = $1 AND role = 'user' ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Direct referral count for every role = user user, zero included.
pub async fn direct_referral_counts(db: impl PgExecutor<'_>) -> sqlx::Result<Vec<(Uuid, i64)>> {
    sqlx::query_as(
        r#"
        SELECT u.id, COUNT(c.id)
        FROM users u
        LEFT JOIN users c ON c.referred_by = u.id AND c.role = 'user'
        WHERE u.role = 'user'
        GROUP BY u.id
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn count_direct_referrals(db: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE referred_by = $1 AND role = 'user'")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    Ok(row.0)
}
