/// Data models for the credential lifecycle
pub mod account;

pub use account::{Account, AccountUpdate, AuthProvider, NewAccount, PendingCode};
