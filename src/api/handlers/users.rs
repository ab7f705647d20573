use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{investment_repo, transaction_repo, user_repo};
use crate::errors::AppError;
use crate::finance::{reconcile_user, Reconciliation};
use crate::jobs::weekly_bonus::record_weekly_eligibility;
use crate::models::{Investment, Transaction, User, WeeklyBonusTracking};
use crate::referral::{register_user, team_summary, TeamSummary};
use crate::AppState;

use super::ApiResponse;

const DEFAULT_TXN_LIMIT: i64 = 50;
const MAX_TXN_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub credential_hash: String,
    pub referral_code: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/users — register, optionally under a referral code
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = register_user(
        &state.db,
        &state.policy,
        &req.email,
        &req.credential_hash,
        req.referral_code.as_deref().filter(|c| !c.trim().is_empty()),
    )
    .await?;

    Ok(Json(ApiResponse::ok(user)))
}

/// GET /api/users/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = find_user(&state, id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// GET /api/users/{id}/team — direct referrals, team size, depth
pub async fn team(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TeamSummary>>, AppError> {
    find_user(&state, id).await?;
    let summary = team_summary(&state.db, id).await?;

    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/users/{id}/transactions?limit=N — newest first
pub async fn transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    find_user(&state, id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_TXN_LIMIT).clamp(1, MAX_TXN_LIMIT);
    let rows = transaction_repo::get_user_transactions(&state.db, id, limit).await?;

    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/users/{id}/investments
pub async fn investments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Investment>>>, AppError> {
    find_user(&state, id).await?;
    let rows = investment_repo::get_user_investments(&state.db, id).await?;

    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/users/{id}/reconcile — wallet vs ledger
pub async fn reconcile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Reconciliation>>, AppError> {
    let rec = reconcile_user(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(rec)))
}

/// POST /api/users/{id}/weekly-eligibility — record this week's bonus as pending
pub async fn weekly_eligibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Option<WeeklyBonusTracking>>>, AppError> {
    let record =
        record_weekly_eligibility(&state.db, &state.policy, id, state.jobs.offset, Utc::now()).await?;

    Ok(Json(ApiResponse::ok(record)))
}

async fn find_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    user_repo::get_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
}
