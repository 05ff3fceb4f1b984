//! User domain types shared by the services and the API layer.

use serde::{Deserialize, Serialize};

use crate::entities::users;

/// Gates every capability-checked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Unknown role strings fall back to the least-privileged role.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "admin" { Self::Admin } else { Self::User }
    }
}

/// User data handed out by the repository. Excludes the password hash and
/// TOTP secret; those only travel through the credential-verification path.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub postcode: String,
    pub phone: String,
    pub role: Role,
    /// PEM, encrypts this user's draws
    pub public_key: String,
    /// PEM, decrypts this user's draws at read time
    pub private_key: String,
    pub registered_on: String,
    pub current_login: Option<String>,
    pub last_login: Option<String>,
    pub current_login_ip: Option<String>,
    pub last_login_ip: Option<String>,
    pub total_logins: i32,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            date_of_birth: model.date_of_birth,
            postcode: model.postcode,
            phone: model.phone,
            role: Role::parse(&model.role),
            public_key: model.public_key,
            private_key: model.private_key,
            registered_on: model.registered_on,
            current_login: model.current_login,
            last_login: model.last_login,
            current_login_ip: model.current_login_ip,
            last_login_ip: model.last_login_ip,
            total_logins: model.total_logins,
        }
    }
}
