/// Credential lifecycle handlers
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AuthError, Result};
use crate::security::jwt::SESSION_TTL_DAYS;
use crate::services::AuthSession;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 2, message = "Name too short"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Please enter a valid 6-digit code"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Captcha token is required"))]
    pub captcha_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Please enter a valid 6-digit code"))]
    pub code: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub account_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub account_id: Uuid,
    pub email: String,
    pub token: String,
}

fn validated<T: Validate>(req: T) -> Result<T> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    Ok(req)
}

/// The boundary stores the session token as an HTTP-only cookie; this core
/// only decides its content and max age.
pub(crate) fn session_response(message: &str, session: AuthSession) -> impl IntoResponse {
    let cookie = format!(
        "auth_token={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        session.token,
        SESSION_TTL_DAYS * 24 * 60 * 60
    );
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SessionResponse {
            message: message.to_string(),
            account_id: session.account_id,
            email: session.email,
            token: session.token,
        }),
    )
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    let req = validated(req)?;
    let outcome = state.engine.signup(&req.name, &req.email, &req.password).await?;

    Ok(Json(SignupResponse {
        message: "Account created! Please check your email for the code".to_string(),
        account_id: outcome.account_id,
        email: outcome.email,
    }))
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state.engine.verify_code(&req.email, &req.code).await?;

    Ok(Json(MessageResponse {
        message: "Your email has been successfully verified".to_string(),
    }))
}

pub async fn resend_code(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state.engine.resend_code(&req.email).await?;

    Ok(Json(MessageResponse {
        message: "A new code has been sent to your email".to_string(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let req = validated(req)?;
    let session = state.engine.login(&req.email, &req.password).await?;

    Ok(session_response("Login successful", session))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state
        .engine
        .forgot_password(&req.email, &req.captcha_token)
        .await?;

    Ok(Json(MessageResponse {
        message: "A password reset code has been sent to your email".to_string(),
    }))
}

pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state.engine.verify_reset_code(&req.email, &req.code).await?;

    Ok(Json(MessageResponse {
        message: "Code verified. Please set your new password".to_string(),
    }))
}

pub async fn resend_reset_code(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state.engine.resend_reset_code(&req.email).await?;

    Ok(Json(MessageResponse {
        message: "A new reset code has been sent to your email".to_string(),
    }))
}

pub async fn update_password(
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let req = validated(req)?;
    state
        .engine
        .update_password(&req.email, &req.code, &req.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Your password has been reset successfully".to_string(),
    }))
}
