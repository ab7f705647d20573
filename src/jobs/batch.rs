use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{transaction_repo, user_repo};
use crate::models::{NewTransaction, RelatedEntity, TransactionType};

/// Payouts accumulated in memory during a job run and written in bulk.
///
/// Each credit is one ledger entry plus one wallet delta; deltas are summed
/// per user so the flush issues a single balance UPDATE.
#[derive(Debug, Default)]
pub struct PayoutBatch {
    entries: Vec<NewTransaction>,
    deltas: BTreeMap<Uuid, Decimal>,
}

impl PayoutBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a completed credit. Non-positive amounts are dropped.
    pub fn credit(
        &mut self,
        user_id: Uuid,
        txn_type: TransactionType,
        amount: Decimal,
        related: Option<RelatedEntity>,
    ) -> bool {
        if amount <= Decimal::ZERO {
            return false;
        }

        self.entries
            .push(NewTransaction::credit(user_id, txn_type, amount, related));
        *self.deltas.entry(user_id).or_insert(Decimal::ZERO) += amount;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn entries(&self) -> &[NewTransaction] {
        &self.entries
    }

    /// Net amount queued for one user.
    pub fn delta_for(&self, user_id: Uuid) -> Decimal {
        self.deltas.get(&user_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Write all entries and wallet deltas on `conn` (normally inside the
    /// job's transaction). Wallets are updated in user-id order.
    pub async fn flush(&self, conn: &mut PgConnection, at: DateTime<Utc>) -> sqlx::Result<()> {
        transaction_repo::insert_transactions(&mut *conn, &self.entries, at).await?;

        let deltas: Vec<(Uuid, Decimal)> = self.deltas.iter().map(|(k, v)| (*k, *v)).collect();
        user_repo::bulk_increment_balances(&mut *conn, &deltas).await?;

        Ok(())
    }
}
