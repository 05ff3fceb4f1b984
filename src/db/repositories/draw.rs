use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::draws;

pub struct DrawRepository {
    conn: DatabaseConnection,
}

impl DrawRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Persist a new draw. `numbers` is already ciphertext by this point.
    pub async fn insert(
        &self,
        user_id: i32,
        numbers: String,
        master_draw: bool,
        lottery_round: i32,
    ) -> Result<draws::Model> {
        let active = draws::ActiveModel {
            user_id: Set(user_id),
            numbers: Set(numbers),
            been_played: Set(false),
            matches_master: Set(false),
            master_draw: Set(master_draw),
            lottery_round: Set(lottery_round),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert draw")
    }

    /// The master draw row, played or not. At most one exists.
    pub async fn master_draw(&self) -> Result<Option<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::MasterDraw.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query master draw")
    }

    pub async fn unplayed_master_draw(&self) -> Result<Option<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::MasterDraw.eq(true))
            .filter(draws::Column::BeenPlayed.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query unplayed master draw")
    }

    /// Delete-before-insert half of the single-master invariant.
    pub async fn delete_master_draw(&self) -> Result<()> {
        draws::Entity::delete_many()
            .filter(draws::Column::MasterDraw.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to delete master draw")?;
        Ok(())
    }

    pub async fn unplayed_for_user(&self, user_id: i32) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::UserId.eq(user_id))
            .filter(draws::Column::MasterDraw.eq(false))
            .filter(draws::Column::BeenPlayed.eq(false))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query unplayed draws")
    }

    pub async fn played_for_user(&self, user_id: i32) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::UserId.eq(user_id))
            .filter(draws::Column::MasterDraw.eq(false))
            .filter(draws::Column::BeenPlayed.eq(true))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query played draws")
    }

    /// All unplayed user draws across accounts, id ascending so a round
    /// run processes them in a deterministic order.
    pub async fn unplayed_user_draws(&self) -> Result<Vec<draws::Model>> {
        draws::Entity::find()
            .filter(draws::Column::MasterDraw.eq(false))
            .filter(draws::Column::BeenPlayed.eq(false))
            .order_by_asc(draws::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query unplayed user draws")
    }

    /// Commit the outcome for a single user draw. Each call is its own
    /// transaction so one bad draw cannot poison the rest of a round.
    pub async fn mark_played(
        &self,
        id: i32,
        matches_master: bool,
        lottery_round: i32,
    ) -> Result<()> {
        let active = draws::ActiveModel {
            id: Set(id),
            been_played: Set(true),
            matches_master: Set(matches_master),
            lottery_round: Set(lottery_round),
            ..Default::default()
        };

        active
            .update(&self.conn)
            .await
            .context("Failed to mark draw as played")?;
        Ok(())
    }

    pub async fn mark_master_played(&self, id: i32) -> Result<()> {
        let active = draws::ActiveModel {
            id: Set(id),
            been_played: Set(true),
            ..Default::default()
        };

        active
            .update(&self.conn)
            .await
            .context("Failed to mark master draw as played")?;
        Ok(())
    }

    /// Delete a user's played, non-master draws. Returns rows removed.
    pub async fn purge_played(&self, user_id: i32) -> Result<u64> {
        let result = draws::Entity::delete_many()
            .filter(draws::Column::UserId.eq(user_id))
            .filter(draws::Column::MasterDraw.eq(false))
            .filter(draws::Column::BeenPlayed.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to purge played draws")?;

        Ok(result.rows_affected)
    }
}
