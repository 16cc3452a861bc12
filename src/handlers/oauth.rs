/// Provider login handler
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AuthError, Result};
use crate::handlers::auth::session_response;
use crate::models::AuthProvider;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProviderLoginRequest {
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

pub async fn provider_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(req): Json<ProviderLoginRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let provider = match AuthProvider::parse(&provider) {
        Some(p) if p != AuthProvider::Credentials => p,
        _ => return Err(AuthError::Validation(format!("Unknown provider: {provider}"))),
    };

    let session = state.engine.provider_login(provider, &req.access_token).await?;
    Ok(session_response("Provider login successful", session))
}
