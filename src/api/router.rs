use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics));

    // Protected API routes — require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Users and their referral trees
        .route("/api/users", post(handlers::users::register))
        .route("/api/users/:id", get(handlers::users::detail))
        .route("/api/users/:id/team", get(handlers::users::team))
        .route("/api/users/:id/transactions", get(handlers::users::transactions))
        .route("/api/users/:id/investments", get(handlers::users::investments))
        .route("/api/users/:id/reconcile", get(handlers::users::reconcile))
        .route("/api/users/:id/weekly-eligibility", post(handlers::users::weekly_eligibility))
        // Money movement
        .route("/api/investments", post(handlers::investments::create))
        .route("/api/withdrawals", post(handlers::withdrawals::request))
        // Admin
        .route("/api/admin/withdrawals/:id/approve", post(handlers::withdrawals::approve))
        .route("/api/admin/withdrawals/:id/reject", post(handlers::withdrawals::reject))
        .route("/api/admin/jobs/:job/run", post(handlers::jobs::run))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
