//! Domain service for registration and multi-factor authentication.

use serde::Deserialize;
use thiserror::Error;

use crate::auth::LoginAttemptGuard;
use crate::models::{Role, User};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email address already exists")]
    DuplicateEmail,

    /// Deliberately does not say which factor failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient role for this operation")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Profile and password supplied at registration. Validated defensively
/// even though the form layer checks the same rules.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub postcode: String,
    pub phone: String,
    pub password: String,
}

/// Registration result: the new account plus the otpauth URI the
/// presentation layer renders as a QR code for PIN setup.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user: User,
    pub provisioning_uri: String,
}

/// One login request's worth of factors.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginAttempt {
    pub email: String,
    pub password: String,
    pub pin: String,
    pub postcode: String,
    #[serde(default)]
    pub origin_ip: Option<String>,
}

/// Outcome of one authentication attempt. The caller owns the guard and
/// persists it between requests; this service only advances it.
#[derive(Debug)]
pub enum LoginOutcome {
    Success(User),
    /// One or more factors failed; the guard has been advanced.
    Failure { remaining_attempts: u32 },
    /// The session is locked until an explicit guard reset.
    Locked,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates an account: validates the profile, hashes the password,
    /// generates the PIN secret and the one-time key pair.
    ///
    /// # Errors
    ///
    /// [`AuthError::DuplicateEmail`] if the email is taken,
    /// [`AuthError::Validation`] for malformed profile fields.
    async fn register(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<RegisteredUser, AuthError>;

    /// Runs the password + PIN + postcode checks against one attempt,
    /// advancing the caller's guard. Telemetry is recorded on success.
    async fn authenticate(
        &self,
        attempt: &LoginAttempt,
        guard: &mut LoginAttemptGuard,
    ) -> Result<LoginOutcome, AuthError>;

    async fn get_user(&self, id: i32) -> Result<Option<User>, AuthError>;

    /// All non-admin accounts, for the admin views.
    async fn list_players(&self) -> Result<Vec<User>, AuthError>;
}
