use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::{NewUser, StoredCredentials};

use crate::entities::{draws, security_logs};
use crate::models::{Role, User};

/// Facade over the per-table repositories. Everything above this layer
/// deals in domain types; ciphertext handling stays in the services.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.starts_with("sqlite::memory:");

        // A pooled in-memory database would give every connection its own
        // empty copy; pin such pools to a single connection.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn draw_repo(&self) -> repositories::draw::DrawRepository {
        repositories::draw::DrawRepository::new(self.conn.clone())
    }

    fn logs_repo(&self) -> repositories::logs::SecurityLogRepository {
        repositories::logs::SecurityLogRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_with_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(User, StoredCredentials)>> {
        self.user_repo().get_with_credentials(email).await
    }

    pub async fn record_login(&self, id: i32, origin_ip: Option<&str>) -> Result<User> {
        self.user_repo().record_login(id, origin_ip).await
    }

    pub async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.user_repo().list_by_role(role).await
    }

    // Draws

    pub async fn insert_draw(
        &self,
        user_id: i32,
        numbers: String,
        master_draw: bool,
        lottery_round: i32,
    ) -> Result<draws::Model> {
        self.draw_repo()
            .insert(user_id, numbers, master_draw, lottery_round)
            .await
    }

    pub async fn master_draw(&self) -> Result<Option<draws::Model>> {
        self.draw_repo().master_draw().await
    }

    pub async fn unplayed_master_draw(&self) -> Result<Option<draws::Model>> {
        self.draw_repo().unplayed_master_draw().await
    }

    pub async fn delete_master_draw(&self) -> Result<()> {
        self.draw_repo().delete_master_draw().await
    }

    pub async fn unplayed_draws_for_user(&self, user_id: i32) -> Result<Vec<draws::Model>> {
        self.draw_repo().unplayed_for_user(user_id).await
    }

    pub async fn played_draws_for_user(&self, user_id: i32) -> Result<Vec<draws::Model>> {
        self.draw_repo().played_for_user(user_id).await
    }

    pub async fn unplayed_user_draws(&self) -> Result<Vec<draws::Model>> {
        self.draw_repo().unplayed_user_draws().await
    }

    pub async fn mark_draw_played(
        &self,
        id: i32,
        matches_master: bool,
        lottery_round: i32,
    ) -> Result<()> {
        self.draw_repo()
            .mark_played(id, matches_master, lottery_round)
            .await
    }

    pub async fn mark_master_played(&self, id: i32) -> Result<()> {
        self.draw_repo().mark_master_played(id).await
    }

    pub async fn purge_played_draws(&self, user_id: i32) -> Result<u64> {
        self.draw_repo().purge_played(user_id).await
    }

    // Security audit log

    pub async fn add_security_log(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        details: Option<String>,
    ) -> Result<()> {
        self.logs_repo().add(event_type, level, message, details).await
    }

    pub async fn recent_security_logs(&self, limit: u64) -> Result<Vec<security_logs::Model>> {
        self.logs_repo().recent(limit).await
    }
}
