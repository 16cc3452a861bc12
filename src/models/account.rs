use chrono::{DateTime, Utc};
/// Account aggregate and related value types
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an account was originally created. Not an exclusive capability: a
/// provider-created account may later acquire a password through the reset
/// flow, and a credentials account may later link a provider subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Credentials,
    Google,
    Facebook,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Credentials => "credentials",
            AuthProvider::Google => "google",
            AuthProvider::Facebook => "facebook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credentials" => Some(AuthProvider::Credentials),
            "google" => Some(AuthProvider::Google),
            "facebook" => Some(AuthProvider::Facebook),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending one-time code with its absolute expiry. "No pending operation"
/// is `None`, never a half-set pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    pub fn matches(&self, candidate: &str) -> bool {
        self.code == candidate
    }

    /// Strictly past expiry; a check at exactly `expires_at` still passes.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Account record as seen by the engine.
///
/// `password_hash` is only materialized by `find_by_email_with_secret`;
/// regular lookups carry `has_password` so provider-only checks never need
/// the secret itself.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub has_password: bool,
    pub provider: AuthProvider,
    pub google_subject: Option<String>,
    pub facebook_subject: Option<String>,
    pub verified: bool,
    pub verification: Option<PendingCode>,
    pub reset: Option<PendingCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn subject_for(&self, provider: AuthProvider) -> Option<&str> {
        match provider {
            AuthProvider::Google => self.google_subject.as_deref(),
            AuthProvider::Facebook => self.facebook_subject.as_deref(),
            AuthProvider::Credentials => None,
        }
    }

    /// An account with no password hash can only authenticate through a
    /// linked provider.
    pub fn is_provider_only(&self) -> bool {
        !self.has_password
    }
}

/// Fields for creating a new account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub google_subject: Option<String>,
    pub facebook_subject: Option<String>,
    pub verified: bool,
    pub verification: Option<PendingCode>,
}

impl NewAccount {
    /// A credentials signup: unverified, with a pending verification code.
    pub fn credentials(
        email: String,
        display_name: String,
        password_hash: String,
        verification: PendingCode,
    ) -> Self {
        Self {
            email,
            display_name,
            password_hash: Some(password_hash),
            provider: AuthProvider::Credentials,
            google_subject: None,
            facebook_subject: None,
            verified: false,
            verification: Some(verification),
        }
    }

    /// A provider-created account: verified immediately, no password.
    pub fn provider_linked(
        email: String,
        display_name: String,
        provider: AuthProvider,
        subject: String,
    ) -> Self {
        let (google_subject, facebook_subject) = match provider {
            AuthProvider::Google => (Some(subject), None),
            AuthProvider::Facebook => (None, Some(subject)),
            AuthProvider::Credentials => (None, None),
        };
        Self {
            email,
            display_name,
            password_hash: None,
            provider,
            google_subject,
            facebook_subject,
            verified: true,
            verification: None,
        }
    }
}

/// Three-state patch field: leave untouched, set, or clear.
pub type Patch<T> = Option<Option<T>>;

/// Partial update applied by email. `None` leaves a field untouched;
/// `verify` only ever upgrades (a verified account is never downgraded).
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub verify: bool,
    pub verification: Patch<PendingCode>,
    pub reset: Patch<PendingCode>,
    pub google_subject: Option<String>,
    pub facebook_subject: Option<String>,
}

impl AccountUpdate {
    /// Re-issue an unverified signup in place: new name, password and code.
    pub fn reissue_signup(
        display_name: String,
        password_hash: String,
        verification: PendingCode,
    ) -> Self {
        Self {
            display_name: Some(display_name),
            password_hash: Some(password_hash),
            verification: Some(Some(verification)),
            ..Self::default()
        }
    }

    pub fn set_verification(verification: PendingCode) -> Self {
        Self {
            verification: Some(Some(verification)),
            ..Self::default()
        }
    }

    pub fn set_reset(reset: PendingCode) -> Self {
        Self {
            reset: Some(Some(reset)),
            ..Self::default()
        }
    }

    pub fn link_subject(provider: AuthProvider, subject: String) -> Self {
        let mut update = Self {
            verify: true,
            ..Self::default()
        };
        match provider {
            AuthProvider::Google => update.google_subject = Some(subject),
            AuthProvider::Facebook => update.facebook_subject = Some(subject),
            AuthProvider::Credentials => {}
        }
        update
    }
}
