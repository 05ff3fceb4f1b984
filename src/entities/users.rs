use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    /// Base32 shared secret for the time-based one-time PIN
    pub totp_secret: String,

    pub first_name: String,

    pub last_name: String,

    /// DD/MM/YYYY
    pub date_of_birth: String,

    /// Doubles as a login factor
    pub postcode: String,

    pub phone: String,

    /// "user" or "admin"
    pub role: String,

    /// RSA public key (PEM), used to encrypt this user's draws
    #[sea_orm(column_type = "Text")]
    pub public_key: String,

    /// RSA private key (PEM). Issued once at registration, never rotated.
    #[sea_orm(column_type = "Text")]
    pub private_key: String,

    pub registered_on: String,

    pub current_login: Option<String>,

    pub last_login: Option<String>,

    pub current_login_ip: Option<String>,

    pub last_login_ip: Option<String>,

    pub total_logins: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::draws::Entity")]
    Draws,
}

impl Related<super::draws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Draws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
