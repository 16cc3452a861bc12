/// In-memory collaborators for exercising the lifecycle engine without a
/// database or network. The repository mirrors the conditional-update
/// semantics of the Postgres implementation, including the code-consuming
/// transitions being conditioned on the code still matching at write time.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use identity_service::db::AccountRepository;
use identity_service::error::{AuthError, Result};
use identity_service::models::{Account, AccountUpdate, AuthProvider, NewAccount};
use identity_service::services::{CaptchaVerifier, CodeKind, CodeNotifier, IdentityClaim, IdentityVerifier};

#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(email: &str) -> String {
        email.to_ascii_lowercase()
    }

    pub fn get(&self, email: &str) -> Option<Account> {
        self.accounts.lock().unwrap().get(&Self::key(email)).cloned()
    }

    /// The currently pending verification code, as a test would read it from
    /// the delivered email.
    pub fn verification_code(&self, email: &str) -> Option<String> {
        self.get(email)?.verification.map(|p| p.code)
    }

    pub fn reset_code(&self, email: &str) -> Option<String> {
        self.get(email)?.reset.map(|p| p.code)
    }

    /// Backdate the pending verification expiry, simulating elapsed time.
    pub fn age_verification(&self, email: &str, minutes: i64) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&Self::key(email)) {
            if let Some(pending) = account.verification.as_mut() {
                pending.expires_at = pending.expires_at - Duration::minutes(minutes);
            }
        }
    }

    pub fn age_reset(&self, email: &str, minutes: i64) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&Self::key(email)) {
            if let Some(pending) = account.reset.as_mut() {
                pending.expires_at = pending.expires_at - Duration::minutes(minutes);
            }
        }
    }

    fn strip(account: &Account) -> Account {
        Account {
            password_hash: None,
            ..account.clone()
        }
    }

    fn subject_taken(
        accounts: &HashMap<String, Account>,
        skip_email: &str,
        provider: AuthProvider,
        subject: &str,
    ) -> bool {
        accounts.values().any(|a| {
            a.email != skip_email && a.subject_for(provider) == Some(subject)
        })
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.get(email).as_ref().map(Self::strip))
    }

    async fn find_by_email_with_secret(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.get(email))
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let key = Self::key(&new.email);
        if accounts.contains_key(&key) {
            return Err(AuthError::AlreadyRegistered);
        }
        for (provider, subject) in [
            (AuthProvider::Google, &new.google_subject),
            (AuthProvider::Facebook, &new.facebook_subject),
        ] {
            if let Some(subject) = subject {
                if Self::subject_taken(&accounts, &new.email, provider, subject) {
                    return Err(AuthError::SubjectConflict);
                }
            }
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: new.email.clone(),
            display_name: new.display_name,
            has_password: new.password_hash.is_some(),
            password_hash: new.password_hash,
            provider: new.provider,
            google_subject: new.google_subject,
            facebook_subject: new.facebook_subject,
            verified: new.verified,
            verification: new.verification,
            reset: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(key, account.clone());
        Ok(Self::strip(&account))
    }

    async fn update_by_email(
        &self,
        email: &str,
        update: AccountUpdate,
    ) -> Result<Option<Account>> {
        let mut accounts = self.accounts.lock().unwrap();

        for (provider, subject) in [
            (AuthProvider::Google, &update.google_subject),
            (AuthProvider::Facebook, &update.facebook_subject),
        ] {
            if let Some(subject) = subject {
                if Self::subject_taken(&accounts, &Self::key(email), provider, subject) {
                    return Err(AuthError::SubjectConflict);
                }
            }
        }

        let Some(account) = accounts.get_mut(&Self::key(email)) else {
            return Ok(None);
        };

        if let Some(name) = update.display_name {
            account.display_name = name;
        }
        if let Some(hash) = update.password_hash {
            account.password_hash = Some(hash);
            account.has_password = true;
        }
        account.verified = account.verified || update.verify;
        if let Some(verification) = update.verification {
            account.verification = verification;
        }
        if let Some(reset) = update.reset {
            account.reset = reset;
        }
        if let Some(subject) = update.google_subject {
            account.google_subject = Some(subject);
        }
        if let Some(subject) = update.facebook_subject {
            account.facebook_subject = Some(subject);
        }
        account.updated_at = Utc::now();

        Ok(Some(Self::strip(account)))
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<Account>> {
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&Self::key(email)) else {
            return Ok(None);
        };
        match &account.verification {
            Some(pending) if pending.code == code => {
                account.verified = true;
                account.verification = None;
                account.updated_at = Utc::now();
                Ok(Some(Self::strip(account)))
            }
            _ => Ok(None),
        }
    }

    async fn consume_reset_code(
        &self,
        email: &str,
        code: &str,
        password_hash: &str,
    ) -> Result<Option<Account>> {
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&Self::key(email)) else {
            return Ok(None);
        };
        match &account.reset {
            Some(pending) if pending.code == code => {
                account.password_hash = Some(password_hash.to_string());
                account.has_password = true;
                account.verified = true;
                account.reset = None;
                account.updated_at = Utc::now();
                Ok(Some(Self::strip(account)))
            }
            _ => Ok(None),
        }
    }
}

/// Notifier that records deliveries and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(CodeKind, String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(CodeKind, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CodeNotifier for RecordingNotifier {
    async fn send_code(&self, kind: CodeKind, email: &str, code: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp unreachable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((kind, email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Verifier that maps access tokens to canned claims.
#[derive(Clone, Default)]
pub struct StubVerifier {
    claims: Arc<Mutex<HashMap<String, IdentityClaim>>>,
}

impl StubVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, access_token: &str, claim: IdentityClaim) {
        self.claims
            .lock()
            .unwrap()
            .insert(access_token.to_string(), claim);
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, provider: AuthProvider, access_token: &str) -> Option<IdentityClaim> {
        self.claims
            .lock()
            .unwrap()
            .get(access_token)
            .filter(|claim| claim.provider == provider)
            .cloned()
    }
}

/// Captcha oracle with a programmable answer.
#[derive(Clone)]
pub struct StubCaptcha {
    pass: Arc<AtomicBool>,
}

impl StubCaptcha {
    pub fn passing() -> Self {
        Self {
            pass: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_pass(&self, pass: bool) {
        self.pass.store(pass, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptchaVerifier for StubCaptcha {
    async fn verify(&self, _token: &str) -> bool {
        self.pass.load(Ordering::SeqCst)
    }
}
