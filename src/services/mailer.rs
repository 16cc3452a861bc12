use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Which flow a code email belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Verification,
    PasswordReset,
}

/// Delivers a one-time code to a user. Failures are absorbed by the engine:
/// a committed state transition is never rolled back because mail delivery
/// failed.
#[async_trait]
pub trait CodeNotifier: Send + Sync {
    async fn send_code(&self, kind: CodeKind, email: &str, code: &str) -> anyhow::Result<()>;
}

/// SMTP notifier sending the HTML code emails.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl CodeNotifier for SmtpNotifier {
    async fn send_code(&self, kind: CodeKind, email: &str, code: &str) -> anyhow::Result<()> {
        let (subject, body) = match kind {
            CodeKind::Verification => (
                format!("{code} is your verification code"),
                verification_body(code),
            ),
            CodeKind::PasswordReset => (
                format!("{code} is your password reset code"),
                reset_body(code),
            ),
        };

        let message = Message::builder()
            .from(self.from.parse()?)
            .to(email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

fn code_panel(heading: &str, lead: &str, code: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; max-width: 400px; margin: auto; border: 1px solid #eee; padding: 20px; border-radius: 10px;">
  <h2 style="text-align: center; color: #333;">{heading}</h2>
  <p>{lead}</p>
  <p>This code is valid for 10 minutes:</p>
  <div style="background: #f4f4f4; padding: 15px; text-align: center; font-size: 32px; font-weight: bold; letter-spacing: 5px; color: #000; border-radius: 5px;">
    {code}
  </div>
  <p style="font-size: 12px; color: #888; margin-top: 25px; text-align: center;">
    Please do not share this code with anyone.
  </p>
</div>"#
    )
}

fn verification_body(code: &str) -> String {
    code_panel(
        "Verify Your Email",
        "Enter the following code to verify your account.",
        code,
    )
}

fn reset_body(code: &str) -> String {
    code_panel(
        "Reset Your Password",
        "Enter the following code to reset your password.",
        code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_embed_the_code() {
        assert!(verification_body("123456").contains("123456"));
        assert!(reset_body("654321").contains("654321"));
    }
}
