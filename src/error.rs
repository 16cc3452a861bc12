use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Credential lifecycle error taxonomy.
///
/// Every variant except `Database`, `Upstream` and `Internal` is an expected
/// business outcome with a stable user-facing message; infrastructure faults
/// surface as a generic "try again" to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid form data: {0}")]
    Validation(String),

    /// Deliberately identical for unknown-email and wrong-password so the
    /// login path never reveals whether an account exists.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No account found with this email address")]
    AccountNotFound,

    #[error("This email is already registered. Please login")]
    AlreadyRegistered,

    #[error("Account already verified. Please login")]
    AlreadyVerified,

    #[error("Please verify your email before logging in")]
    NotVerified,

    #[error("This account uses {0} login. Please login with {0}")]
    ProviderOnlyAccount(crate::models::AuthProvider),

    #[error("The code you entered is incorrect")]
    CodeMismatch,

    #[error("This code has expired. Please request a new one")]
    CodeExpired,

    #[error("No pending code found. Please request a new one")]
    NoPendingCode,

    #[error("This identity is already linked to another account")]
    SubjectConflict,

    #[error("Captcha verification failed. Please try again")]
    CaptchaFailed,

    #[error("Could not verify the provider login. Please try again")]
    InvalidIdentityClaim,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::CaptchaFailed => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::NotVerified
            | AuthError::InvalidIdentityClaim => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyRegistered
            | AuthError::AlreadyVerified
            | AuthError::ProviderOnlyAccount(_)
            | AuthError::SubjectConflict => StatusCode::CONFLICT,
            AuthError::CodeMismatch | AuthError::NoPendingCode => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::CodeExpired => StatusCode::GONE,
            AuthError::Database(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::Internal(_) | AuthError::Upstream(_) => {
                "Something went wrong. Please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Internal(format!("token error: {err}"))
    }
}
