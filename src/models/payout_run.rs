use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One completed run of a period-guarded job (daily ROI, monthly salary).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutRun {
    pub id: Uuid,
    pub job: String,
    pub period_key: String,
    pub payouts: i32,
    pub total_amount: Decimal,
    pub started_at: DateTime<Utc>,
}
