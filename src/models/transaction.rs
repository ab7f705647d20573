use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RelatedEntity, RelatedEntityKind, TransactionStatus, TransactionType};

/// Database row for transactions table: the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub txn_id: String,
    pub user_id: Uuid,
    pub txn_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub related_kind: Option<RelatedEntityKind>,
    pub related_id: Option<Uuid>,
    pub admin_fee_applied: Option<Decimal>,
    pub wallet_address: Option<String>,
    pub admin_notes: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn related_entity(&self) -> Option<RelatedEntity> {
        RelatedEntity::from_parts(self.related_kind, self.related_id)
    }
}

/// A ledger entry that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub txn_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub related: Option<RelatedEntity>,
    pub admin_fee_applied: Option<Decimal>,
    pub wallet_address: Option<String>,
}

impl NewTransaction {
    /// A completed credit, the shape of every payout.
    pub fn credit(
        user_id: Uuid,
        txn_type: TransactionType,
        amount: Decimal,
        related: Option<RelatedEntity>,
    ) -> Self {
        Self {
            user_id,
            txn_type,
            amount,
            status: TransactionStatus::Completed,
            related,
            admin_fee_applied: None,
            wallet_address: None,
        }
    }
}
