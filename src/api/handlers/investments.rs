use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::finance::{create_investment, InvestmentReceipt};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct CreateInvestmentRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
}

/// POST /api/investments — invest and pay the direct referral bonus
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateInvestmentRequest>,
) -> Result<Json<ApiResponse<InvestmentReceipt>>, AppError> {
    let receipt = create_investment(&state.db, &state.policy, req.user_id, req.amount).await?;
    Ok(Json(ApiResponse::ok(receipt)))
}
