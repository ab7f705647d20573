use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::finance::txn_id::generate_txn_id;
use crate::models::{NewTransaction, RelatedEntity, Transaction, TransactionStatus};

/// Rows per multi-row INSERT; 11 binds each keeps well under the 65535 limit.
const INSERT_CHUNK: usize = 2_000;

/// Write one ledger entry.
pub async fn insert_transaction(
    db: impl PgExecutor<'_>,
    txn: &NewTransaction,
    at: DateTime<Utc>,
) -> sqlx::Result<Transaction> {
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
            (txn_id, user_id, txn_type, amount, status, related_kind, related_id,
             admin_fee_applied, wallet_address, transaction_date, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(generate_txn_id(txn.txn_type, at))
    .bind(txn.user_id)
    .bind(txn.txn_type)
    .bind(txn.amount)
    .bind(txn.status)
    .bind(txn.related.map(|r| r.kind()))
    .bind(txn.related.map(|r| r.id()))
    .bind(txn.admin_fee_applied)
    .bind(txn.wallet_address.as_deref())
    .bind(at)
    .fetch_one(db)
    .await
}

/// Write many ledger entries with multi-row INSERTs. Returns rows written.
pub async fn insert_transactions(
    conn: &mut PgConnection,
    txns: &[NewTransaction],
    at: DateTime<Utc>,
) -> sqlx::Result<u64> {
    let mut written = 0;

    for chunk in txns.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO transactions \
             (txn_id, user_id, txn_type, amount, status, related_kind, related_id, \
              admin_fee_applied, wallet_address, transaction_date, updated_at) ",
        );

        qb.push_values(chunk, |mut row, txn| {
            row.push_bind(generate_txn_id(txn.txn_type, at))
                .push_bind(txn.user_id)
                .push_bind(txn.txn_type)
                .push_bind(txn.amount)
                .push_bind(txn.status)
                .push_bind(txn.related.map(|r| r.kind()))
                .push_bind(txn.related.map(|r| r.id()))
                .push_bind(txn.admin_fee_applied)
                .push_bind(txn.wallet_address.clone())
                .push_bind(at)
                .push_bind(at);
        });

        written += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(written)
}

pub async fn get_transaction(db: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Move a pending withdrawal to `to`. Returns `None` when the row is not a
/// pending withdrawal any more, so only one caller can win the transition.
pub async fn transition_pending_withdrawal(
    db: impl PgExecutor<'_>,
    id: Uuid,
    to: TransactionStatus,
    notes: Option<&str>,
) -> sqlx::Result<Option<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = $2, admin_notes = COALESCE($3, admin_notes), updated_at = NOW()
        WHERE id = $1 AND txn_type = 'withdrawal' AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(to)
    .bind(notes)
    .fetch_optional(db)
    .await
}

/// Most recent ledger entries for a user.
pub async fn get_user_transactions(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = $1
        ORDER BY transaction_date DESC, txn_id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

/// All ledger entries triggered by an entity.
pub async fn get_related_transactions(
    db: impl PgExecutor<'_>,
    related: RelatedEntity,
) -> sqlx::Result<Vec<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE related_kind = $1 AND related_id = $2
        ORDER BY transaction_date, txn_id
        "#,
    )
    .bind(related.kind())
    .bind(related.id())
    .fetch_all(db)
    .await
}

/// Wallet balance implied by the ledger: completed credits minus withdrawal
/// reservations (pending/completed: amount + fee, failed: fee only).
pub async fn ledger_balance(db: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Decimal> {
    let row: (Option<Decimal>,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(
            CASE
                WHEN txn_type <> 'withdrawal' AND status = 'completed' THEN amount
                WHEN txn_type = 'withdrawal' AND status IN ('pending', 'completed')
                    THEN -(amount + COALESCE(admin_fee_applied, 0))
                WHEN txn_type = 'withdrawal' AND status = 'failed'
                    THEN -COALESCE(admin_fee_applied, 0)
                ELSE 0
            END
        ), 0)
        FROM transactions
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(row.0.unwrap_or(Decimal::ZERO))
}
