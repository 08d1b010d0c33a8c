//! Doctor accounts: Argon2id password hashing and HS256 bearer tokens.

pub mod password;
pub mod tokens;

pub use password::PasswordService;
pub use tokens::{TokenClaims, TokenError, TokenService};
