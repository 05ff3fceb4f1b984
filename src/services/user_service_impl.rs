//! `SeaORM` implementation of the `UserService` trait.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::task;
use tracing::warn;

use crate::auth::credentials;
use crate::auth::guard::{GuardState, LoginAttemptGuard};
use crate::config::SecurityConfig;
use crate::crypto;
use crate::db::{NewUser, Store};
use crate::models::{Role, User};
use crate::services::user_service::{
    AuthError, LoginAttempt, LoginOutcome, Registration, RegisteredUser, UserService,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

// Names must not contain any of: * ? ! ' ^ + % & / ( ) = } ] [ { $ # @ < >
static NAME_FORBIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*?!'^+%&/()=}\]\[{$#@<>]").expect("valid regex"));

// XXXX-XXX-XXXX
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{3}-\d{4}$").expect("valid regex"));

// DD/MM/YYYY
static DOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid regex"));

/// 6-12 chars with at least one digit, one lowercase, one uppercase and
/// one special character.
fn check_password_policy(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(6..=12).contains(&len) {
        return Err(AuthError::Validation(
            "Password must be between 6 and 12 characters".to_string(),
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace());

    if has_digit && has_lower && has_upper && has_special {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "Password must contain a digit, a lowercase letter, an uppercase letter and a special character".to_string(),
        ))
    }
}

fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
    if !EMAIL_RE.is_match(&registration.email) {
        return Err(AuthError::Validation("Invalid email address".to_string()));
    }

    for name in [&registration.first_name, &registration.last_name] {
        if name.is_empty() {
            return Err(AuthError::Validation("Name must not be empty".to_string()));
        }
        if NAME_FORBIDDEN_RE.is_match(name) {
            return Err(AuthError::Validation(
                "Name must not contain special characters".to_string(),
            ));
        }
    }

    if !PHONE_RE.is_match(&registration.phone) {
        return Err(AuthError::Validation(
            "Phone number must be in format: XXXX-XXX-XXXX".to_string(),
        ));
    }

    if !DOB_RE.is_match(&registration.date_of_birth) {
        return Err(AuthError::Validation(
            "Date of birth must be in format: DD/MM/YYYY".to_string(),
        ));
    }

    if registration.postcode.is_empty() {
        return Err(AuthError::Validation(
            "Postcode must not be empty".to_string(),
        ));
    }

    check_password_policy(&registration.password)
}

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn audit(&self, event_type: &str, message: &str, details: Option<String>) {
        if let Err(e) = self
            .store
            .add_security_log(event_type, "warning", message, details)
            .await
        {
            warn!("Failed to write security log: {e}");
        }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn register(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<RegisteredUser, AuthError> {
        validate_registration(&registration)?;

        if self
            .store
            .get_user_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail);
        }

        let security = self.security.clone();
        let password = registration.password.clone();
        // Argon2 hashing is CPU-intensive; keep it off the async runtime
        let password_hash =
            task::spawn_blocking(move || credentials::hash_password(&password, Some(&security)))
                .await
                .map_err(|e| AuthError::Internal(format!("Hashing task panicked: {e}")))??;

        // Key generation is the slow part of registration; entropy or
        // algorithm failure aborts account creation entirely.
        let keypair = task::spawn_blocking(crypto::generate_keypair)
            .await
            .map_err(|e| AuthError::Internal(format!("Key generation task panicked: {e}")))?
            .map_err(|e| AuthError::Internal(format!("Key generation failed: {e}")))?;

        let totp_secret = credentials::generate_totp_secret();
        let provisioning_uri = credentials::provisioning_uri(&totp_secret, &registration.email)?;

        let user = self
            .store
            .create_user(NewUser {
                email: registration.email,
                password_hash,
                totp_secret,
                first_name: registration.first_name,
                last_name: registration.last_name,
                date_of_birth: registration.date_of_birth,
                postcode: registration.postcode,
                phone: registration.phone,
                role,
                public_key: keypair.public_pem,
                private_key: keypair.private_pem,
            })
            .await?;

        if role == Role::Admin {
            self.audit(
                "admin_registered",
                &format!("New admin registered [{}]", user.email),
                None,
            )
            .await;
        }

        Ok(RegisteredUser {
            user,
            provisioning_uri,
        })
    }

    async fn authenticate(
        &self,
        attempt: &LoginAttempt,
        guard: &mut LoginAttemptGuard,
    ) -> Result<LoginOutcome, AuthError> {
        let max_attempts = self.security.max_login_attempts;

        if guard.is_locked(max_attempts) {
            self.audit(
                "login_locked",
                &format!(
                    "Login attempt on locked session [{}, {}]",
                    attempt.email,
                    attempt.origin_ip.as_deref().unwrap_or("unknown")
                ),
                None,
            )
            .await;
            return Ok(LoginOutcome::Locked);
        }

        let found = self.store.get_user_with_credentials(&attempt.email).await?;

        // Evaluate every factor before combining so the response does not
        // reveal which one failed.
        let verified = if let Some((user, stored)) = &found {
            let hash = stored.password_hash.clone();
            let password = attempt.password.clone();
            let password_ok = task::spawn_blocking(move || {
                credentials::verify_password(&hash, &password)
            })
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task panicked: {e}")))??;

            let pin_ok = credentials::verify_pin(&stored.totp_secret, &attempt.pin)?;
            let postcode_ok = credentials::verify_postcode(&user.postcode, &attempt.postcode);

            password_ok && pin_ok && postcode_ok
        } else {
            // Unknown account still burns a real hash verification so the
            // timing does not separate "no such user" from "bad password".
            let password = attempt.password.clone();
            let _ = task::spawn_blocking(move || {
                let hash = credentials::hash_password("invalid", None)?;
                credentials::verify_password(&hash, &password)
            })
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task panicked: {e}")))?;

            false
        };

        if verified {
            let (user, _) = found.ok_or(AuthError::UserNotFound)?;
            guard.record_success();
            let user = self
                .store
                .record_login(user.id, attempt.origin_ip.as_deref())
                .await?;
            return Ok(LoginOutcome::Success(user));
        }

        let state = guard.record_failure(max_attempts);
        self.audit(
            "login_failed",
            &format!(
                "Failed login attempt [{}, {}]",
                attempt.email,
                attempt.origin_ip.as_deref().unwrap_or("unknown")
            ),
            Some(format!("failed_attempts={}", guard.failed_attempts())),
        )
        .await;

        match state {
            GuardState::Locked => {
                self.audit(
                    "session_locked",
                    &format!("Login session locked after repeated failures [{}]", attempt.email),
                    None,
                )
                .await;
                Ok(LoginOutcome::Locked)
            }
            GuardState::Open { remaining } => Ok(LoginOutcome::Failure {
                remaining_attempts: remaining,
            }),
        }
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(id).await?)
    }

    async fn list_players(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users_by_role(Role::User).await?)
    }
}
