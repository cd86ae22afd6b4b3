use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use super::AppState;
use super::handlers;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health (public)
        .route("/health", get(handlers::health::health_check))
        // Auth (public)
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(handlers::auth::reset_password))
        // Auth (protected)
        .route("/api/v1/auth/me", get(handlers::auth::me))
        // Notes (protected, scoped to the authenticated user)
        .route("/api/v1/notes", get(handlers::notes::list).post(handlers::notes::create))
        .route(
            "/api/v1/notes/{id}",
            get(handlers::notes::get).put(handlers::notes::update).delete(handlers::notes::delete),
        )
        // Prometheus metrics (public)
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
        .with_state(state)
        // 前端静态文件 + SPA fallback（必须在 with_state 之后）
        .fallback_service(
            ServeDir::new("frontend/dist")
                .fallback(ServeFile::new("frontend/dist/index.html"))
        )
}
