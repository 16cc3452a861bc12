pub mod auth;
pub mod oauth;

pub use auth::{
    forgot_password, login, resend_code, resend_reset_code, signup, update_password,
    verify_code, verify_reset_code,
};
pub use oauth::provider_login;
