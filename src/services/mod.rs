/// Engine and external collaborator services
pub mod captcha;
pub mod engine;
pub mod identity;
pub mod mailer;

pub use captcha::{CaptchaVerifier, HcaptchaVerifier};
pub use engine::{AuthSession, LifecycleEngine, SignupOutcome};
pub use identity::{HttpIdentityVerifier, IdentityClaim, IdentityVerifier};
pub use mailer::{CodeKind, CodeNotifier, SmtpNotifier};
