//! Password hashing for doctor accounts
//!
//! Argon2id with the OWASP-recommended parameters. Hashing and verification
//! are CPU-bound and run on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use rand::rngs::OsRng;

/// Memory cost in KiB (19 MiB)
const M_COST: u32 = 19456;
const T_COST: u32 = 2;
const P_COST: u32 = 1;
const OUTPUT_LEN: usize = 32;

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Result<Self> {
        let params = Params::new(M_COST, T_COST, P_COST, Some(OUTPUT_LEN))
            .map_err(|e| anyhow!("Failed to build Argon2 params: {}", e))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password using Argon2id
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let argon2 = self.argon2.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("Failed to hash password: {}", e))
        })
        .await
        .context("Password hashing task panicked")?
    }

    /// Verify a password against a stored hash. Unparseable hashes (such as
    /// the placeholder stored for the demo user) never verify.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let argon2 = self.argon2.clone();

        tokio::task::spawn_blocking(move || {
            let Ok(parsed_hash) = PasswordHash::new(&hash) else {
                return Ok(false);
            };
            match argon2.verify_password(password.as_bytes(), &parsed_hash) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(anyhow!("Password verification error: {}", e)),
            }
        })
        .await
        .context("Password verification task panicked")?
    }
}
