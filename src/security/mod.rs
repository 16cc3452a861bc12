/// Security primitives: password hashing, one-time codes, session tokens
pub mod jwt;
pub mod otp;
pub mod password;

pub use jwt::{SessionClaims, TokenIssuer};
pub use password::{hash_password, verify_password};
