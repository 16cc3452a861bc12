use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::models::AuthProvider;

/// Normalized identity claim returned by a third-party verifier.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    pub provider: AuthProvider,
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub email_verified: bool,
}

/// Validates a provider access token and returns the identity it asserts.
///
/// Returns `None` on any failure (expired token, network fault, missing
/// scope); the caller treats that as an unverifiable login attempt.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, provider: AuthProvider, access_token: &str) -> Option<IdentityClaim>;
}

const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const FACEBOOK_USERINFO_URL: &str = "https://graph.facebook.com/me";

/// Verifier backed by the providers' userinfo endpoints.
#[derive(Clone)]
pub struct HttpIdentityVerifier {
    http: Client,
}

impl HttpIdentityVerifier {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    async fn verify_google(&self, access_token: &str) -> Option<IdentityClaim> {
        #[derive(Deserialize)]
        struct GoogleUserInfo {
            sub: String,
            email: Option<String>,
            name: Option<String>,
            email_verified: Option<bool>,
        }

        let resp = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| tracing::warn!(error = %e, "google userinfo request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "google token verification failed");
            return None;
        }

        let info: GoogleUserInfo = resp
            .json()
            .await
            .map_err(|e| tracing::warn!(error = %e, "google userinfo parse failed"))
            .ok()?;

        Some(IdentityClaim {
            provider: AuthProvider::Google,
            subject: info.sub,
            email: info.email,
            name: info.name,
            email_verified: info.email_verified.unwrap_or(false),
        })
    }

    async fn verify_facebook(&self, access_token: &str) -> Option<IdentityClaim> {
        #[derive(Deserialize)]
        struct FacebookUserInfo {
            id: String,
            email: Option<String>,
            name: Option<String>,
        }

        let resp = self
            .http
            .get(FACEBOOK_USERINFO_URL)
            .query(&[("fields", "id,name,email")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| tracing::warn!(error = %e, "facebook userinfo request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "facebook token verification failed");
            return None;
        }

        let info: FacebookUserInfo = resp
            .json()
            .await
            .map_err(|e| tracing::warn!(error = %e, "facebook userinfo parse failed"))
            .ok()?;

        // Facebook only returns an email when the scope was granted; a
        // missing one fails the login later at the engine.
        Some(IdentityClaim {
            provider: AuthProvider::Facebook,
            subject: info.id,
            email: info.email,
            name: info.name,
            email_verified: true,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, provider: AuthProvider, access_token: &str) -> Option<IdentityClaim> {
        match provider {
            AuthProvider::Google => self.verify_google(access_token).await,
            AuthProvider::Facebook => self.verify_facebook(access_token).await,
            AuthProvider::Credentials => None,
        }
    }
}
