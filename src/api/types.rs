use serde::Serialize;

use crate::models::User;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Public view of an account. Key material and secrets never leave the
/// service layer.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: crate::models::Role,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

/// Admin view including login telemetry.
#[derive(Debug, Serialize)]
pub struct UserActivityDto {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub registered_on: String,
    pub current_login: Option<String>,
    pub last_login: Option<String>,
    pub current_login_ip: Option<String>,
    pub last_login_ip: Option<String>,
    pub total_logins: i32,
}

impl From<&User> for UserActivityDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            registered_on: user.registered_on.clone(),
            current_login: user.current_login.clone(),
            last_login: user.last_login.clone(),
            current_login_ip: user.current_login_ip.clone(),
            last_login_ip: user.last_login_ip.clone(),
            total_logins: user.total_logins,
        }
    }
}
