/// One-time code policy: fixed-length numeric codes with a fixed TTL
use chrono::{Duration, Utc};
use rand::Rng;

use crate::models::PendingCode;

/// Codes are always exactly this many decimal digits.
pub const CODE_LENGTH: usize = 6;

/// Both verification and reset codes expire this long after issuance.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Generate a uniformly random zero-padded numeric code.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// Issue a fresh pending code expiring `CODE_TTL_MINUTES` from now.
pub fn issue_code() -> PendingCode {
    PendingCode {
        code: generate_code(),
        expires_at: Utc::now() + Duration::minutes(CODE_TTL_MINUTES),
    }
}
