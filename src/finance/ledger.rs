use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{transaction_repo, user_repo};
use crate::errors::{LedgerError, LedgerResult};

/// A wallet next to the balance its ledger implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub user_id: Uuid,
    pub wallet_balance: Decimal,
    pub ledger_balance: Decimal,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.wallet_balance == self.ledger_balance
    }

    pub fn drift(&self) -> Decimal {
        self.wallet_balance - self.ledger_balance
    }
}

/// Compare a user's cached wallet balance with their ledger.
pub async fn reconcile_user(pool: &PgPool, user_id: Uuid) -> LedgerResult<Reconciliation> {
    let mut tx = pool.begin().await?;

    let user = user_repo::get_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {user_id}")))?;
    let ledger_balance = transaction_repo::ledger_balance(&mut *tx, user_id).await?;

    tx.commit().await?;

    let rec = Reconciliation {
        user_id,
        wallet_balance: user.wallet_balance,
        ledger_balance,
    };

    if !rec.is_consistent() {
        tracing::error!(
            user_id = %user_id,
            wallet = %rec.wallet_balance,
            ledger = %rec.ledger_balance,
            drift = %rec.drift(),
            "Wallet balance does not match ledger"
        );
    }

    Ok(rec)
}
