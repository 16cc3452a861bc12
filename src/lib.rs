// Identity Service Library

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use error::{AuthError, Result};
pub use models::{Account, AuthProvider, PendingCode};

use db::PgAccountRepository;
use services::{HcaptchaVerifier, HttpIdentityVerifier, LifecycleEngine, SmtpNotifier};

/// Engine with the production collaborators plugged in.
pub type Engine =
    LifecycleEngine<PgAccountRepository, SmtpNotifier, HttpIdentityVerifier, HcaptchaVerifier>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}
