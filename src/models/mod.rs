pub mod investment;
pub mod payout_run;
pub mod tracking;
pub mod transaction;
pub mod user;

pub use investment::Investment;
pub use payout_run::PayoutRun;
pub use tracking::WeeklyBonusTracking;
pub use transaction::{NewTransaction, Transaction};
pub use user::{User, UserEdge};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

// ---------------------------------------------------------------------------
// Investment status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "investment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Withdrawn,
}

// ---------------------------------------------------------------------------
// Transaction type: closed set of money movements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    RoiPayout,
    DirectReferralBonus,
    WeeklyBonus,
    MonthlySalary,
    RegistrationBonus,
    LevelIncome,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::RoiPayout => "roi_payout",
            TransactionType::DirectReferralBonus => "direct_referral_bonus",
            TransactionType::WeeklyBonus => "weekly_bonus",
            TransactionType::MonthlySalary => "monthly_salary",
            TransactionType::RegistrationBonus => "registration_bonus",
            TransactionType::LevelIncome => "level_income",
        }
    }

    /// Prefix used in human-auditable transaction ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEP",
            TransactionType::Withdrawal => "WDR",
            TransactionType::RoiPayout => "ROI",
            TransactionType::DirectReferralBonus => "DRB",
            TransactionType::WeeklyBonus => "WKB",
            TransactionType::MonthlySalary => "MSL",
            TransactionType::RegistrationBonus => "REG",
            TransactionType::LevelIncome => "LVL",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transaction status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// Weekly tracking status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tracking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    Paid,
}

// ---------------------------------------------------------------------------
// Related entity: what a ledger entry was triggered by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "related_entity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityKind {
    User,
    Investment,
}

/// Tagged reference stored explicitly at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RelatedEntity {
    User(Uuid),
    Investment(Uuid),
}

impl RelatedEntity {
    pub fn kind(&self) -> RelatedEntityKind {
        match self {
            RelatedEntity::User(_) => RelatedEntityKind::User,
            RelatedEntity::Investment(_) => RelatedEntityKind::Investment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RelatedEntity::User(id) | RelatedEntity::Investment(id) => *id,
        }
    }

    pub fn from_parts(kind: Option<RelatedEntityKind>, id: Option<Uuid>) -> Option<Self> {
        match (kind?, id?) {
            (RelatedEntityKind::User, id) => Some(RelatedEntity::User(id)),
            (RelatedEntityKind::Investment, id) => Some(RelatedEntity::Investment(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_entity_round_trips_through_columns() {
        let id = Uuid::new_v4();
        let entity = RelatedEntity::Investment(id);
        let back = RelatedEntity::from_parts(Some(entity.kind()), Some(entity.id()));
        assert_eq!(back, Some(entity));
    }

    #[test]
    fn test_related_entity_requires_both_columns() {
        assert_eq!(RelatedEntity::from_parts(Some(RelatedEntityKind::User), None), None);
        assert_eq!(RelatedEntity::from_parts(None, Some(Uuid::new_v4())), None);
    }

    #[test]
    fn test_related_entity_serializes_as_tagged_union() {
        let id = Uuid::nil();
        let json = serde_json::to_value(RelatedEntity::User(id)).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["id"], id.to_string());
    }
}
