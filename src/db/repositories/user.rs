use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::users;
use crate::models::{Role, User};

/// Everything needed to insert a user row. Password is already hashed and
/// the key pair already issued by the time this reaches the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub totp_secret: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub postcode: String,
    pub phone: String,
    pub role: Role,
    pub public_key: String,
    pub private_key: String,
}

/// Secret columns that only the credential-verification path may see.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub password_hash: String,
    pub totp_secret: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let active = users::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            totp_secret: Set(new_user.totp_secret),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            date_of_birth: Set(new_user.date_of_birth),
            postcode: Set(new_user.postcode),
            phone: Set(new_user.phone),
            role: Set(new_user.role.as_str().to_string()),
            public_key: Set(new_user.public_key),
            private_key: Set(new_user.private_key),
            registered_on: Set(Utc::now().to_rfc3339()),
            total_logins: Set(0),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Fetch a user together with the secret columns needed to verify a
    /// login attempt.
    pub async fn get_with_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(User, StoredCredentials)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for credential check")?;

        Ok(user.map(|model| {
            let credentials = StoredCredentials {
                password_hash: model.password_hash.clone(),
                totp_secret: model.totp_secret.clone(),
            };
            (User::from(model), credentials)
        }))
    }

    /// Shift current login info to last, record the new one, bump the
    /// total. Called only after a fully successful authentication.
    pub async fn record_login(&self, id: i32, origin_ip: Option<&str>) -> Result<User> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for login telemetry")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let total = user.total_logins + 1;
        let previous_login = user.current_login.clone();
        let previous_ip = user.current_login_ip.clone();

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(previous_login);
        active.last_login_ip = Set(previous_ip);
        active.current_login = Set(Some(Utc::now().to_rfc3339()));
        active.current_login_ip = Set(origin_ip.map(ToString::to_string));
        active.total_logins = Set(total);

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to record login")?;

        Ok(User::from(model))
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let models = users::Entity::find()
            .filter(users::Column::Role.eq(role.as_str()))
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users by role")?;

        Ok(models.into_iter().map(User::from).collect())
    }
}
