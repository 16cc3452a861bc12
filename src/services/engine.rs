use chrono::Utc;
use uuid::Uuid;

use crate::db::AccountRepository;
use crate::error::{AuthError, Result};
use crate::models::{AccountUpdate, AuthProvider, NewAccount};
use crate::security::{self, otp, TokenIssuer};
use crate::services::captcha::CaptchaVerifier;
use crate::services::identity::IdentityVerifier;
use crate::services::mailer::{CodeKind, CodeNotifier};

/// Identification returned by a successful signup.
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub account_id: Uuid,
    pub email: String,
}

/// A successfully authenticated session: identity plus a minted token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account_id: Uuid,
    pub email: String,
    pub token: String,
}

/// Credential lifecycle engine.
///
/// Orchestrates the account state machine across the repository, notifier,
/// identity verifier and captcha oracle. Collaborators are injected at
/// construction and every operation is a short-lived request/response unit;
/// the repository is the only shared mutable state.
///
/// Resend operations are deliberately unthrottled here; any cooldown is an
/// advisory client concern.
pub struct LifecycleEngine<R, N, V, C> {
    repo: R,
    notifier: N,
    verifier: V,
    captcha: C,
    tokens: TokenIssuer,
}

impl<R, N, V, C> LifecycleEngine<R, N, V, C>
where
    R: AccountRepository,
    N: CodeNotifier,
    V: IdentityVerifier,
    C: CaptchaVerifier,
{
    pub fn new(repo: R, notifier: N, verifier: V, captcha: C, tokens: TokenIssuer) -> Self {
        Self {
            repo,
            notifier,
            verifier,
            captcha,
            tokens,
        }
    }

    /// Register a credentials account, or re-issue the pending verification
    /// for an existing unverified one.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<SignupOutcome> {
        let email = normalize_email(email);
        let existing = self.repo.find_by_email(&email).await?;

        if let Some(account) = &existing {
            if account.is_provider_only() {
                return Err(AuthError::ProviderOnlyAccount(account.provider));
            }
            if account.verified {
                return Err(AuthError::AlreadyRegistered);
            }
        }

        let password_hash = security::hash_password(password)?;
        let verification = otp::issue_code();
        let code = verification.code.clone();

        let account = match existing {
            // Unverified signup retried: overwrite name, password and code
            // in place rather than rejecting.
            Some(_) => self
                .repo
                .update_by_email(
                    &email,
                    AccountUpdate::reissue_signup(name.to_string(), password_hash, verification),
                )
                .await?
                .ok_or(AuthError::AccountNotFound)?,
            None => {
                self.repo
                    .create(NewAccount::credentials(
                        email.clone(),
                        name.to_string(),
                        password_hash,
                        verification,
                    ))
                    .await?
            }
        };

        tracing::info!(account_id = %account.id, "signup verification code issued");
        self.notify(CodeKind::Verification, &account.email, &code).await;

        Ok(SignupOutcome {
            account_id: account.id,
            email: account.email,
        })
    }

    /// Consume a verification code, transitioning unverified -> verified.
    /// Idempotent for accounts that are already verified.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if account.verified {
            return Ok(());
        }

        let pending = account.verification.as_ref().ok_or(AuthError::NoPendingCode)?;
        // Mismatch is reported before expiry so a wrong code never leaks
        // whether the right one has lapsed.
        if !pending.matches(code) {
            return Err(AuthError::CodeMismatch);
        }
        if pending.is_expired(Utc::now()) {
            return Err(AuthError::CodeExpired);
        }

        // Conditional on the code still being pending at write time, so two
        // racing calls can accept it at most once.
        match self.repo.consume_verification_code(&email, code).await? {
            Some(account) => {
                tracing::info!(account_id = %account.id, "email verified");
                Ok(())
            }
            None => Err(AuthError::CodeMismatch),
        }
    }

    /// Re-issue the verification code. The previous code becomes unusable.
    pub async fn resend_code(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if account.verified {
            return Err(AuthError::AlreadyVerified);
        }

        let verification = otp::issue_code();
        let code = verification.code.clone();
        let account = self
            .repo
            .update_by_email(&email, AccountUpdate::set_verification(verification))
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(account_id = %account.id, "verification code re-issued");
        self.notify(CodeKind::Verification, &account.email, &code).await;
        Ok(())
    }

    /// Password login. Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email);
        let account = self
            .repo
            .find_by_email_with_secret(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.verified {
            return Err(AuthError::NotVerified);
        }

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(AuthError::ProviderOnlyAccount(account.provider))?;
        security::verify_password(password, hash)?;

        let token = self.tokens.issue(account.id, &account.email)?;
        tracing::info!(account_id = %account.id, "login succeeded");

        Ok(AuthSession {
            account_id: account.id,
            email: account.email,
            token,
        })
    }

    /// Start a password reset. The captcha assertion must pass before any
    /// code is issued; a failing captcha has no side effect on the account.
    pub async fn forgot_password(&self, email: &str, captcha_token: &str) -> Result<()> {
        if !self.captcha.verify(captcha_token).await {
            return Err(AuthError::CaptchaFailed);
        }

        let email = normalize_email(email);
        self.repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let reset = otp::issue_code();
        let code = reset.code.clone();
        let account = self
            .repo
            .update_by_email(&email, AccountUpdate::set_reset(reset))
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(account_id = %account.id, "password reset code issued");
        self.notify(CodeKind::PasswordReset, &account.email, &code).await;
        Ok(())
    }

    /// Read-only check of a reset code. Does not consume it; consumption
    /// happens at `update_password`, enabling the two-step reset flow.
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let pending = account.reset.as_ref().ok_or(AuthError::NoPendingCode)?;
        if !pending.matches(code) {
            return Err(AuthError::CodeMismatch);
        }
        if pending.is_expired(Utc::now()) {
            return Err(AuthError::CodeExpired);
        }

        Ok(())
    }

    /// Re-issue the reset code for an existing account.
    pub async fn resend_reset_code(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        self.repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let reset = otp::issue_code();
        let code = reset.code.clone();
        let account = self
            .repo
            .update_by_email(&email, AccountUpdate::set_reset(reset))
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(account_id = %account.id, "password reset code re-issued");
        self.notify(CodeKind::PasswordReset, &account.email, &code).await;
        Ok(())
    }

    /// Consume a reset code and install the new password. Match and expiry
    /// are re-validated here independently of `verify_reset_code`, since
    /// time passes between the two steps. A successful reset also marks the
    /// account verified: it proves control of the mailbox.
    pub async fn update_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let pending = account.reset.as_ref().ok_or(AuthError::NoPendingCode)?;
        if !pending.matches(code) {
            return Err(AuthError::CodeMismatch);
        }
        if pending.is_expired(Utc::now()) {
            return Err(AuthError::CodeExpired);
        }

        let password_hash = security::hash_password(new_password)?;
        match self
            .repo
            .consume_reset_code(&email, code, &password_hash)
            .await?
        {
            Some(account) => {
                tracing::info!(account_id = %account.id, "password reset completed");
                Ok(())
            }
            None => Err(AuthError::NoPendingCode),
        }
    }

    /// Google/Facebook login. Creates a verified account on first sight of
    /// an email, links the provider subject on an existing one, and always
    /// ends in a minted session or a hard failure; there is no pending state.
    pub async fn provider_login(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> Result<AuthSession> {
        let claim = self
            .verifier
            .verify(provider, access_token)
            .await
            .ok_or(AuthError::InvalidIdentityClaim)?;

        let email = normalize_email(claim.email.as_deref().ok_or(AuthError::InvalidIdentityClaim)?);
        let display_name = claim
            .name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());

        let account = match self.repo.find_by_email(&email).await? {
            None => {
                let account = self
                    .repo
                    .create(NewAccount::provider_linked(
                        email.clone(),
                        display_name,
                        claim.provider,
                        claim.subject.clone(),
                    ))
                    .await?;
                tracing::info!(
                    account_id = %account.id,
                    provider = %claim.provider,
                    "provider signup"
                );
                account
            }
            Some(account) => match account.subject_for(claim.provider).map(str::to_string) {
                // One subject id per provider per account; a different
                // subject asserting the same email is a conflict.
                Some(existing) if existing != claim.subject => {
                    return Err(AuthError::SubjectConflict)
                }
                Some(_) if account.verified => account,
                _ => self
                    .repo
                    .update_by_email(
                        &email,
                        AccountUpdate::link_subject(claim.provider, claim.subject.clone()),
                    )
                    .await?
                    .ok_or(AuthError::AccountNotFound)?,
            },
        };

        let token = self.tokens.issue(account.id, &account.email)?;
        tracing::info!(account_id = %account.id, provider = %claim.provider, "provider login");

        Ok(AuthSession {
            account_id: account.id,
            email: account.email,
            token,
        })
    }

    /// Best-effort code delivery: a notifier fault never rolls back or fails
    /// the committed transition that triggered it.
    async fn notify(&self, kind: CodeKind, email: &str, code: &str) {
        if let Err(err) = self.notifier.send_code(kind, email, code).await {
            tracing::warn!(error = %err, email, "code email delivery failed");
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
