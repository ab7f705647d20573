use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::InvestmentStatus;
use crate::finance::roi_band::RoiBand;

/// Database row for investments table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub roi_percentage_min: Decimal,
    pub roi_percentage_max: Decimal,
    pub total_roi_earned: Decimal,
    pub status: InvestmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    /// The band frozen at creation time.
    pub fn roi_band(&self) -> RoiBand {
        RoiBand {
            min_pct: self.roi_percentage_min,
            max_pct: self.roi_percentage_max,
        }
    }
}
