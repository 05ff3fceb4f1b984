use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Seeded admin account. The password and PIN secret are bootstrap
/// values; a deployment is expected to change them after first login.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@email.com";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin1!";
pub const DEFAULT_ADMIN_TOTP_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
const DEFAULT_ADMIN_POSTCODE: &str = "NE1 7RU";

/// Hash the bootstrap admin password with default Argon2id params.
fn hash_default_password() -> String {
    crate::auth::credentials::hash_password(DEFAULT_ADMIN_PASSWORD, None)
        .expect("Failed to hash default admin password")
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Draws)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SecurityLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the admin account with its one-time key pair
        let keypair = crate::crypto::generate_keypair()
            .map_err(|e| DbErr::Custom(format!("Admin key generation failed: {e}")))?;
        let password_hash = hash_default_password();
        let now = chrono::Utc::now().to_rfc3339();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Email,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::TotpSecret,
                crate::entities::users::Column::FirstName,
                crate::entities::users::Column::LastName,
                crate::entities::users::Column::DateOfBirth,
                crate::entities::users::Column::Postcode,
                crate::entities::users::Column::Phone,
                crate::entities::users::Column::Role,
                crate::entities::users::Column::PublicKey,
                crate::entities::users::Column::PrivateKey,
                crate::entities::users::Column::RegisteredOn,
                crate::entities::users::Column::TotalLogins,
            ])
            .values_panic([
                DEFAULT_ADMIN_EMAIL.into(),
                password_hash.into(),
                DEFAULT_ADMIN_TOTP_SECRET.into(),
                "Alice".into(),
                "Jones".into(),
                "01/01/2000".into(),
                DEFAULT_ADMIN_POSTCODE.into(),
                "0191-208-6000".into(),
                "admin".into(),
                keypair.public_pem.into(),
                keypair.private_pem.into(),
                now.into(),
                0.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecurityLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Draws).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
