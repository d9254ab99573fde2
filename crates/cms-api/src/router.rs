use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::complaints;
use crate::middleware::{require_admin, require_auth};

/// Builds the full HTTP surface over the shared state.
pub fn router(state: AppState) -> Router {
    let public_routes: Router<AppState> = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let admin_routes: Router<AppState> = Router::new()
        .route("/api/admin/complaints/all", get(complaints::list_all))
        .route("/api/admin/complaints/{id}/status", put(complaints::update))
        .layer(middleware::from_fn(require_admin));

    // require_auth is the outer layer, so admin checks see its claims
    let protected_routes: Router<AppState> = Router::new()
        .route("/api/complaints", post(complaints::create))
        .route("/api/complaints/my/{user_id}", get(complaints::list_mine))
        .route("/api/complaints/{id}", get(complaints::get_one))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
