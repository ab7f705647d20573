use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Role;

/// Database row for users table.
///
/// `wallet_balance` is a cached projection of the ledger; every change to it
/// is paired with exactly one `transactions` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub role: Role,
    pub wallet_balance: Decimal,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub total_investment: Decimal,
    pub monthly_trade_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Minimal projection of the referral graph: one edge per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct UserEdge {
    pub id: Uuid,
    pub referred_by: Option<Uuid>,
    pub role: Role,
}
