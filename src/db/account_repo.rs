use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{Account, AccountUpdate, AuthProvider, NewAccount, PendingCode};

/// Durable keyed storage for account records; the single source of truth.
///
/// Email lookups are case-insensitive (callers normalize to lowercase, the
/// Postgres implementation additionally matches on `lower(email)`). The two
/// `consume_*` operations are conditional read-modify-writes: the update only
/// applies while the given code is still the pending one, which guarantees
/// at-most-one acceptance per issued code across racing callers.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Look up an account. The password hash is never materialized here.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Look up an account including its password hash, for login.
    async fn find_by_email_with_secret(&self, email: &str) -> Result<Option<Account>>;

    /// Create a new account. A duplicate email surfaces as
    /// `AuthError::AlreadyRegistered`, a duplicate provider subject as
    /// `AuthError::SubjectConflict`.
    async fn create(&self, account: NewAccount) -> Result<Account>;

    /// Apply a partial update. Returns `None` if no account matches.
    async fn update_by_email(&self, email: &str, update: AccountUpdate)
        -> Result<Option<Account>>;

    /// Atomically accept a verification code: marks the account verified and
    /// clears the pending pair, but only if `code` is still the pending
    /// verification code. Returns `None` if it no longer is.
    async fn consume_verification_code(&self, email: &str, code: &str)
        -> Result<Option<Account>>;

    /// Atomically accept a reset code: installs the new password hash, marks
    /// the account verified and clears the pending pair, but only if `code`
    /// is still the pending reset code. Returns `None` if it no longer is.
    async fn consume_reset_code(
        &self,
        email: &str,
        code: &str,
        password_hash: &str,
    ) -> Result<Option<Account>>;
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: Option<String>,
    provider: String,
    google_subject: Option<String>,
    facebook_subject: Option<String>,
    verified: bool,
    verification_code: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    reset_code: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, keep_secret: bool) -> Result<Account> {
        let provider = AuthProvider::parse(&self.provider).ok_or_else(|| {
            AuthError::Database(format!("unknown provider in accounts row: {}", self.provider))
        })?;

        let has_password = self.password_hash.is_some();
        Ok(Account {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            password_hash: if keep_secret { self.password_hash } else { None },
            has_password,
            provider,
            google_subject: self.google_subject,
            facebook_subject: self.facebook_subject,
            verified: self.verified,
            verification: pending_pair(self.verification_code, self.verification_expires_at),
            reset: pending_pair(self.reset_code, self.reset_expires_at),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn pending_pair(code: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<PendingCode> {
    match (code, expires_at) {
        (Some(code), Some(expires_at)) => Some(PendingCode { code, expires_at }),
        _ => None,
    }
}

fn map_unique_violation(err: sqlx::Error, conflict: AuthError) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => AuthError::Database(err.to_string()),
    }
}

const COLUMNS: &str = "id, email, display_name, password_hash, provider, google_subject, \
     facebook_subject, verified, verification_code, verification_expires_at, \
     reset_code, reset_expires_at, created_at, updated_at";

/// Postgres-backed repository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, email: &str, keep_secret: bool) -> Result<Option<Account>> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_account(keep_secret)).transpose()
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch(email, false).await
    }

    async fn find_by_email_with_secret(&self, email: &str) -> Result<Option<Account>> {
        self.fetch(email, true).await
    }

    async fn create(&self, account: NewAccount) -> Result<Account> {
        let sql = format!(
            r#"
            INSERT INTO accounts
                (id, email, display_name, password_hash, provider, google_subject,
                 facebook_subject, verified, verification_code, verification_expires_at,
                 created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9,
                    CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING {COLUMNS}
            "#
        );

        let (code, expires_at) = match &account.verification {
            Some(pending) => (Some(pending.code.clone()), Some(pending.expires_at)),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(&account.password_hash)
            .bind(account.provider.as_str())
            .bind(&account.google_subject)
            .bind(&account.facebook_subject)
            .bind(account.verified)
            .bind(code)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, AuthError::AlreadyRegistered))?;

        row.into_account(false)
    }

    async fn update_by_email(
        &self,
        email: &str,
        update: AccountUpdate,
    ) -> Result<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE accounts SET
                display_name = COALESCE($2, display_name),
                password_hash = COALESCE($3, password_hash),
                verified = verified OR $4,
                verification_code = CASE WHEN $5 THEN $6 ELSE verification_code END,
                verification_expires_at = CASE WHEN $5 THEN $7 ELSE verification_expires_at END,
                reset_code = CASE WHEN $8 THEN $9 ELSE reset_code END,
                reset_expires_at = CASE WHEN $8 THEN $10 ELSE reset_expires_at END,
                google_subject = COALESCE($11, google_subject),
                facebook_subject = COALESCE($12, facebook_subject),
                updated_at = CURRENT_TIMESTAMP
            WHERE lower(email) = lower($1)
            RETURNING {COLUMNS}
            "#
        );

        let (set_verification, verification) = flatten_patch(&update.verification);
        let (set_reset, reset) = flatten_patch(&update.reset);

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .bind(&update.display_name)
            .bind(&update.password_hash)
            .bind(update.verify)
            .bind(set_verification)
            .bind(verification.as_ref().map(|p| p.code.clone()))
            .bind(verification.as_ref().map(|p| p.expires_at))
            .bind(set_reset)
            .bind(reset.as_ref().map(|p| p.code.clone()))
            .bind(reset.as_ref().map(|p| p.expires_at))
            .bind(&update.google_subject)
            .bind(&update.facebook_subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, AuthError::SubjectConflict))?;

        row.map(|r| r.into_account(false)).transpose()
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE accounts SET
                verified = true,
                verification_code = NULL,
                verification_expires_at = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE lower(email) = lower($1) AND verification_code = $2
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_account(false)).transpose()
    }

    async fn consume_reset_code(
        &self,
        email: &str,
        code: &str,
        password_hash: &str,
    ) -> Result<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE accounts SET
                password_hash = $3,
                verified = true,
                reset_code = NULL,
                reset_expires_at = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE lower(email) = lower($1) AND reset_code = $2
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .bind(code)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_account(false)).transpose()
    }
}

fn flatten_patch(patch: &Option<Option<PendingCode>>) -> (bool, Option<PendingCode>) {
    match patch {
        None => (false, None),
        Some(None) => (true, None),
        Some(Some(pending)) => (true, Some(pending.clone())),
    }
}
