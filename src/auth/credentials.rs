//! Login-factor verification: password, time-based PIN, postcode.
//!
//! All three checks are pure; nothing here mutates stored state. The
//! caller combines the results and feeds failures into the attempt guard.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use totp_rs::{Secret, TOTP};

use crate::config::SecurityConfig;

/// Clock-skew tolerance for PIN checks, in 30-second steps.
///
/// Codes are not invalidated after a successful check; a short-lived
/// used-code cache would close the replay window within a step.
const TOTP_SKEW: u8 = 1;
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;

const TOTP_ISSUER: &str = "Tombolr";

/// Hash a password with Argon2id, using configured params when given.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a candidate password against a stored PHC hash.
///
/// Argon2 verification is constant-time over the hash output, so this
/// does not leak where a mismatch occurred.
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a fresh base32 TOTP secret for a new account.
#[must_use]
pub fn generate_totp_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn totp_for(secret: &str, account: &str) -> Result<TOTP> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| anyhow::anyhow!("Invalid TOTP secret: {e:?}"))?;

    TOTP::new(
        totp_rs::Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        bytes,
        Some(TOTP_ISSUER.to_string()),
        account.to_string(),
    )
    .context("Failed to build TOTP verifier")
}

/// Verify a one-time PIN against the shared secret, tolerating ±1 step.
pub fn verify_pin(secret: &str, candidate_code: &str) -> Result<bool> {
    let totp = totp_for(secret, "login")?;
    totp.check_current(candidate_code)
        .context("System clock error during PIN check")
}

/// otpauth:// provisioning URI for the 2FA-setup step after registration.
pub fn provisioning_uri(secret: &str, email: &str) -> Result<String> {
    Ok(totp_for(secret, email)?.get_url())
}

/// Exact postcode match, the third login factor.
#[must_use]
pub fn verify_postcode(stored: &str, candidate: &str) -> bool {
    stored == candidate
}
