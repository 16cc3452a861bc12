use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/auth/signup", post(handlers::signup))
        .route("/api/v1/auth/verify-otp", post(handlers::verify_code))
        .route("/api/v1/auth/resend-otp", post(handlers::resend_code))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/password/forgot", post(handlers::forgot_password))
        .route(
            "/api/v1/auth/password/verify-otp",
            post(handlers::verify_reset_code),
        )
        .route(
            "/api/v1/auth/password/resend-otp",
            post(handlers::resend_reset_code),
        )
        .route("/api/v1/auth/password/update", post(handlers::update_password))
        .route("/api/v1/auth/oauth/:provider", post(handlers::provider_login))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
