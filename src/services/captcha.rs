use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// External boolean oracle for captcha assertions.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> bool;
}

const HCAPTCHA_VERIFY_URL: &str = "https://hcaptcha.com/siteverify";

/// hCaptcha siteverify oracle. Any failure counts as not-a-human.
#[derive(Clone)]
pub struct HcaptchaVerifier {
    http: Client,
    secret: String,
}

impl HcaptchaVerifier {
    pub fn new(http: Client, secret: String) -> Self {
        Self { http, secret }
    }
}

#[async_trait]
impl CaptchaVerifier for HcaptchaVerifier {
    async fn verify(&self, token: &str) -> bool {
        #[derive(Deserialize)]
        struct SiteverifyResponse {
            success: bool,
        }

        let resp = self
            .http
            .post(HCAPTCHA_VERIFY_URL)
            .form(&[("response", token), ("secret", self.secret.as_str())])
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "captcha verification request failed");
                return false;
            }
        };

        match resp.json::<SiteverifyResponse>().await {
            Ok(body) => body.success,
            Err(e) => {
                tracing::warn!(error = %e, "captcha verification parse failed");
                false
            }
        }
    }
}
