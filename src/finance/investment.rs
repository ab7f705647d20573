use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{investment_repo, transaction_repo, user_repo};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Investment, NewTransaction, RelatedEntity, Transaction, TransactionType};

use super::policy::CommissionPolicy;
use super::roi_band::{band_for_amount, to_cents, MAX_AMOUNT};

/// Everything written by one investment.
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentReceipt {
    pub investment: Investment,
    pub deposit: Transaction,
    pub referral_bonus: Option<Transaction>,
    /// Investor's wallet after the deposit.
    pub new_balance: Decimal,
}

/// Validate a requested principal and return it unchanged.
pub fn validate_amount(policy: &CommissionPolicy, amount: Decimal) -> LedgerResult<Decimal> {
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
    if band_for_amount(policy, amount).is_none() {
        return Err(LedgerError::Validation(format!(
            "minimum investment is {}, got {amount}",
            policy.min_investment
        )));
    }
    Ok(amount)
}

/// Create an investment, post its deposit, and pay the direct referrer.
///
/// Steps (investment row, deposit entry, wallet credit, referral bonus) run in
/// one database transaction; any failure leaves no trace.
pub async fn create_investment(
    pool: &PgPool,
    policy: &CommissionPolicy,
    user_id: Uuid,
    amount: Decimal,
) -> LedgerResult<InvestmentReceipt> {
    let amount = validate_amount(policy, amount).inspect_err(|e| {
        tracing::warn!(user_id = %user_id, amount = %amount, "Investment rejected: {e}");
    })?;
    let band = band_for_amount(policy, amount)
        .ok_or_else(|| LedgerError::Validation("amount below investment floor".into()))?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let user = user_repo::get_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {user_id}")))?;

    // 1. Investment with its band frozen
    let investment = investment_repo::insert_investment(&mut *tx, user.id, amount, band, now).await?;
    let link = Some(RelatedEntity::Investment(investment.id));

    // 2. Deposit entry
    let deposit = transaction_repo::insert_transaction(
        &mut *tx,
        &NewTransaction::credit(user.id, TransactionType::Deposit, amount, link),
        now,
    )
    .await?;

    // 3. Wallet credit
    let new_balance = user_repo::increment_balance(&mut *tx, user.id, amount)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {user_id}")))?;
    user_repo::record_investment_totals(&mut *tx, user.id, amount).await?;

    // 4. Direct referral bonus
    let bonus = to_cents(amount * policy.direct_referral_rate);
    let referral_bonus = match user.referred_by {
        Some(referrer) if bonus > Decimal::ZERO => {
            let entry = transaction_repo::insert_transaction(
                &mut *tx,
                &NewTransaction::credit(referrer, TransactionType::DirectReferralBonus, bonus, link),
                now,
            )
            .await?;
            user_repo::increment_balance(&mut *tx, referrer, bonus).await?;
            Some(entry)
        }
        _ => None,
    };

    tx.commit().await?;

    counter!("investments_created").increment(1);
    tracing::info!(
        user_id = %user.id,
        investment_id = %investment.id,
        amount = %amount,
        roi_min = %band.min_pct,
        roi_max = %band.max_pct,
        referral_bonus = ?referral_bonus.as_ref().map(|t| t.amount),
        "Investment created"
    );

    Ok(InvestmentReceipt {
        investment,
        deposit,
        referral_bonus,
        new_balance,
    })
}
