use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::TrackingStatus;

/// Per-user-per-week dedup guard for the weekly team bonus.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyBonusTracking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub referral_count: i32,
    pub bonus_amount_eligible: Decimal,
    pub status: TrackingStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
