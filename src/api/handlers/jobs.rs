use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use crate::errors::AppError;
use crate::jobs::{JobKind, JobSummary};
use crate::AppState;

use super::ApiResponse;

/// POST /api/admin/jobs/{job}/run — run a payout job now.
/// Period guards still apply, so a repeat run reports `skipped`.
pub async fn run(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<Json<ApiResponse<JobSummary>>, AppError> {
    let kind = JobKind::from_str(&job).ok_or_else(|| AppError::NotFound(format!("unknown job {job}")))?;

    tracing::warn!(job = %kind, "Payout job triggered via admin API");
    let summary = state.jobs.run(kind, Utc::now()).await?;

    Ok(Json(ApiResponse::ok(summary)))
}
