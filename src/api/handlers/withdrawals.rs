use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::finance::{approve_withdrawal, raise_withdrawal, reject_withdrawal, WithdrawalReceipt};
use crate::models::Transaction;
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct WithdrawalRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub wallet_address: String,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/withdrawals — reserve amount + fee and queue for review
pub async fn request(
    State(state): State<AppState>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalReceipt>>, AppError> {
    let receipt = raise_withdrawal(
        &state.db,
        &state.policy,
        req.user_id,
        req.amount,
        &req.wallet_address,
    )
    .await?;

    Ok(Json(ApiResponse::ok(receipt)))
}

/// POST /api/admin/withdrawals/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let notes = body.and_then(|Json(d)| d.notes);
    let txn = approve_withdrawal(&state.db, id, notes.as_deref()).await?;

    Ok(Json(ApiResponse::ok(txn)))
}

/// POST /api/admin/withdrawals/{id}/reject — refunds the amount, keeps the fee
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<ApiResponse<WithdrawalReceipt>>, AppError> {
    let notes = body.and_then(|Json(d)| d.notes);
    let receipt = reject_withdrawal(&state.db, id, notes.as_deref()).await?;

    Ok(Json(ApiResponse::ok(receipt)))
}
