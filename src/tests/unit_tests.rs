/// Unit tests for the error taxonomy and account model predicates.
use axum::http::StatusCode;

use crate::error::AuthError;
use crate::models::{AccountUpdate, AuthProvider, NewAccount};
use crate::tests::fixtures::*;

#[test]
fn business_failures_map_to_client_statuses() {
    assert_eq!(
        AuthError::Validation("bad".into()).status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        AuthError::InvalidCredentials.status_code(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(AuthError::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AuthError::AlreadyRegistered.status_code(), StatusCode::CONFLICT);
    assert_eq!(AuthError::AlreadyVerified.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        AuthError::ProviderOnlyAccount(AuthProvider::Google).status_code(),
        StatusCode::CONFLICT
    );
    assert_eq!(
        AuthError::CodeMismatch.status_code(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(AuthError::CodeExpired.status_code(), StatusCode::GONE);
    assert_eq!(AuthError::CaptchaFailed.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn infrastructure_faults_map_to_server_statuses() {
    assert_eq!(
        AuthError::Database("down".into()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AuthError::Internal("oops".into()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AuthError::Upstream("gateway".into()).status_code(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn provider_only_error_names_the_provider() {
    let msg = AuthError::ProviderOnlyAccount(AuthProvider::Google).to_string();
    assert!(msg.contains("google"));
}

#[test]
fn account_predicates() {
    let account = provider_only_account(AuthProvider::Google, "g1");
    assert!(account.is_provider_only());
    assert_eq!(account.subject_for(AuthProvider::Google), Some("g1"));
    assert_eq!(account.subject_for(AuthProvider::Facebook), None);

    let account = verified_account();
    assert!(!account.is_provider_only());
    assert!(account.verified);
}

#[test]
fn unverified_account_carries_a_pending_code() {
    let account = unverified_account("123456");
    let pending = account.verification.as_ref().unwrap();
    assert!(pending.matches("123456"));
    assert!(!pending.matches("654321"));
}

#[test]
fn credentials_signup_starts_unverified() {
    let new = NewAccount::credentials(
        TEST_EMAIL.to_string(),
        TEST_NAME.to_string(),
        "hash".to_string(),
        pending_code("123456", 10),
    );
    assert!(!new.verified);
    assert_eq!(new.provider, AuthProvider::Credentials);
    assert!(new.password_hash.is_some());
    assert!(new.verification.is_some());
}

#[test]
fn provider_signup_starts_verified_without_password() {
    let new = NewAccount::provider_linked(
        TEST_EMAIL.to_string(),
        TEST_NAME.to_string(),
        AuthProvider::Facebook,
        "fb1".to_string(),
    );
    assert!(new.verified);
    assert!(new.password_hash.is_none());
    assert_eq!(new.facebook_subject.as_deref(), Some("fb1"));
    assert!(new.verification.is_none());
}

#[test]
fn link_subject_update_upgrades_verification() {
    let update = AccountUpdate::link_subject(AuthProvider::Google, "g1".to_string());
    assert!(update.verify);
    assert_eq!(update.google_subject.as_deref(), Some("g1"));
    assert!(update.password_hash.is_none());
    assert!(update.verification.is_none());
    assert!(update.reset.is_none());
}
