use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "draws")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user (submitter, or the admin for the master draw)
    pub user_id: i32,

    /// Base64 RSA ciphertext of the canonical number string.
    /// Decrypted at read time only, never persisted as plaintext.
    #[sea_orm(column_type = "Text")]
    pub numbers: String,

    /// Terminal once true; a played draw is never replayed
    pub been_played: bool,

    /// Set during a round run when the numbers equal the master draw's
    pub matches_master: bool,

    /// True for the admin-issued winning draw. At most one row carries this.
    pub master_draw: bool,

    /// 0 for user draws not yet played
    pub lottery_round: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
