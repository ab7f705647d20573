use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{transaction_repo, user_repo};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{
    NewTransaction, RelatedEntity, Transaction, TransactionStatus, TransactionType,
};

use super::policy::CommissionPolicy;
use super::roi_band::{to_cents, MAX_AMOUNT};

/// What a withdrawal of `amount` costs the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WithdrawalQuote {
    pub amount: Decimal,
    pub fee: Decimal,
    /// Reserved from the wallet at request time.
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalReceipt {
    pub transaction: Transaction,
    pub new_balance: Decimal,
}

pub fn quote_withdrawal(policy: &CommissionPolicy, amount: Decimal) -> LedgerResult<WithdrawalQuote> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "withdrawal amount must be positive, got {amount}"
        )));
    }
    if amount.round_dp(2) != amount {
        return Err(LedgerError::Validation(format!(
            "amount {amount} has more than 2 decimal places"
        )));
    }

    if amount >= MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "amount {amount} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }

    let fee = amount
        .checked_mul(policy.withdrawal_fee_rate)
        .map(to_cents)
        .ok_or_else(|| LedgerError::Validation(format!("fee for {amount} is out of range")))?;
    let total = amount
        .checked_add(fee)
        .ok_or_else(|| LedgerError::Validation(format!("total for {amount} is out of range")))?;

    Ok(WithdrawalQuote { amount, fee, total })
}

/// Request a withdrawal: reserve `amount + fee` from the wallet now and
/// record a pending entry for an admin to approve or reject.
///
/// The reservation is a conditional decrement, so two concurrent requests
/// can never take the wallet below zero.
pub async fn raise_withdrawal(
    pool: &PgPool,
    policy: &CommissionPolicy,
    user_id: Uuid,
    amount: Decimal,
    wallet_address: &str,
) -> LedgerResult<WithdrawalReceipt> {
    let wallet_address = wallet_address.trim();
    if wallet_address.is_empty() {
        return Err(LedgerError::Validation("wallet address is required".into()));
    }
    let quote = quote_withdrawal(policy, amount)?;

    let mut tx = pool.begin().await?;

    let user = user_repo::get_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {user_id}")))?;

    let Some(new_balance) = user_repo::debit_if_sufficient(&mut *tx, user.id, quote.total).await? else {
        // the balance read above may predate a concurrent debit
        let available = user_repo::get_user(&mut *tx, user.id)
            .await?
            .map_or(user.wallet_balance, |u| u.wallet_balance);
        tracing::warn!(
            user_id = %user.id,
            required = %quote.total,
            available = %available,
            "Withdrawal rejected: insufficient balance"
        );
        return Err(LedgerError::insufficient(quote.total, available));
    };

    let entry = NewTransaction {
        user_id: user.id,
        txn_type: TransactionType::Withdrawal,
        amount: quote.amount,
        status: TransactionStatus::Pending,
        related: Some(RelatedEntity::User(user.id)),
        admin_fee_applied: Some(quote.fee),
        wallet_address: Some(wallet_address.to_string()),
    };
    let transaction = transaction_repo::insert_transaction(&mut *tx, &entry, Utc::now()).await?;

    tx.commit().await?;

    counter!("withdrawals_requested").increment(1);
    tracing::info!(
        user_id = %user.id,
        txn_id = %transaction.txn_id,
        amount = %quote.amount,
        fee = %quote.fee,
        new_balance = %new_balance,
        "Withdrawal requested"
    );

    Ok(WithdrawalReceipt {
        transaction,
        new_balance,
    })
}

/// Approve a pending withdrawal. Funds were reserved at request time, so
/// the wallet does not move.
pub async fn approve_withdrawal(
    pool: &PgPool,
    id: Uuid,
    notes: Option<&str>,
) -> LedgerResult<Transaction> {
    let mut tx = pool.begin().await?;

    let transaction = transition(&mut tx, id, TransactionStatus::Completed, notes).await?;

    tx.commit().await?;

    counter!("withdrawals_approved").increment(1);
    tracing::info!(
        txn_id = %transaction.txn_id,
        user_id = %transaction.user_id,
        amount = %transaction.amount,
        "Withdrawal approved"
    );

    Ok(transaction)
}

/// Reject a pending withdrawal and refund the requested amount.
/// The fee is forfeited.
pub async fn reject_withdrawal(
    pool: &PgPool,
    id: Uuid,
    notes: Option<&str>,
) -> LedgerResult<WithdrawalReceipt> {
    let mut tx = pool.begin().await?;

    let transaction = transition(&mut tx, id, TransactionStatus::Failed, notes).await?;
    let new_balance = user_repo::increment_balance(&mut *tx, transaction.user_id, transaction.amount)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {}", transaction.user_id)))?;

    tx.commit().await?;

    counter!("withdrawals_rejected").increment(1);
    tracing::info!(
        txn_id = %transaction.txn_id,
        user_id = %transaction.user_id,
        refunded = %transaction.amount,
        new_balance = %new_balance,
        "Withdrawal rejected"
    );

    Ok(WithdrawalReceipt {
        transaction,
        new_balance,
    })
}

/// Move a pending withdrawal to a terminal status, or explain why not.
async fn transition(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    to: TransactionStatus,
    notes: Option<&str>,
) -> LedgerResult<Transaction> {
    if let Some(updated) =
        transaction_repo::transition_pending_withdrawal(&mut **tx, id, to, notes).await?
    {
        return Ok(updated);
    }

    let existing = transaction_repo::get_transaction(&mut **tx, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("transaction {id}")))?;

    if existing.txn_type != TransactionType::Withdrawal {
        return Err(LedgerError::WrongType(format!(
            "transaction {} is a {}, not a withdrawal",
            existing.txn_id, existing.txn_type
        )));
    }

    Err(LedgerError::StateConflict(format!(
        "withdrawal {} is already {}",
        existing.txn_id, existing.status
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_adds_five_percent_fee() {
        let quote = quote_withdrawal(&CommissionPolicy::default(), Decimal::from(100)).unwrap();
        assert_eq!(quote.fee, Decimal::from(5));
        assert_eq!(quote.total, Decimal::from(105));
    }

    #[test]
    fn test_quote_rounds_fee_to_cents() {
        let quote = quote_withdrawal(&CommissionPolicy::default(), Decimal::new(3333, 2)).unwrap();
        // 33.33 * 0.05 = 1.6665
        assert_eq!(quote.fee, Decimal::new(167, 2));
        assert_eq!(quote.total, Decimal::new(3500, 2));
    }

    #[test]
    fn test_quote_rejects_non_positive_amounts() {
        let policy = CommissionPolicy::default();
        assert!(matches!(quote_withdrawal(&policy, Decimal::ZERO), Err(LedgerError::Validation(_))));
        assert!(matches!(quote_withdrawal(&policy, Decimal::from(-1)), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_quote_rejects_amounts_beyond_column_capacity() {
        let policy = CommissionPolicy::default();
        assert!(matches!(quote_withdrawal(&policy, Decimal::MAX), Err(LedgerError::Validation(_))));
        assert!(matches!(quote_withdrawal(&policy, MAX_AMOUNT), Err(LedgerError::Validation(_))));

        let largest = MAX_AMOUNT - Decimal::new(1, 2);
        let quote = quote_withdrawal(&policy, largest).unwrap();
        assert_eq!(quote.total, largest + quote.fee);
    }
}
