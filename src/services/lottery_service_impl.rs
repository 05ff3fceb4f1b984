//! `SeaORM` implementation of the `LotteryService` trait.
//!
//! The round lock serializes master-draw generation and round running so
//! two admins cannot race, and a draw submitted mid-run is cleanly either
//! in this round or the next one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::crypto;
use crate::db::Store;
use crate::models::{DrawNumbers, Role, User};
use crate::services::lottery_service::{
    DrawAnomaly, LotteryError, LotteryService, RevealedDraw, RoundOutcome, RoundWinner,
    SubmittedDraw, WinningDraw,
};

pub struct SeaOrmLotteryService {
    store: Store,
    round_lock: Arc<Mutex<()>>,
}

impl SeaOrmLotteryService {
    #[must_use]
    pub fn new(store: Store, round_lock: Arc<Mutex<()>>) -> Self {
        Self { store, round_lock }
    }

    /// Explicit capability check at the top of each gated operation,
    /// with an audit entry for refusals.
    async fn require_role(&self, actor: &User, role: Role) -> Result<(), LotteryError> {
        if actor.role == role {
            return Ok(());
        }

        if let Err(e) = self
            .store
            .add_security_log(
                "invalid_role",
                "warning",
                &format!(
                    "User attempted operation with invalid role [{}, {}, {:?}]",
                    actor.id, actor.email, actor.role
                ),
                None,
            )
            .await
        {
            warn!("Failed to write security log: {e}");
        }

        Err(LotteryError::Forbidden)
    }

    async fn audit(&self, event_type: &str, message: &str) {
        if let Err(e) = self
            .store
            .add_security_log(event_type, "warning", message, None)
            .await
        {
            warn!("Failed to write security log: {e}");
        }
    }

    /// Private key of a draw's owner, for read-time decryption.
    async fn owner_private_key(&self, user_id: i32) -> Result<String, LotteryError> {
        let owner = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(LotteryError::UnknownUser(user_id))?;
        Ok(owner.private_key)
    }
}

#[async_trait]
impl LotteryService for SeaOrmLotteryService {
    async fn submit_draw(
        &self,
        actor: &User,
        numbers: &[i64],
    ) -> Result<SubmittedDraw, LotteryError> {
        self.require_role(actor, Role::User).await?;

        let draw = DrawNumbers::try_new(numbers)?;
        let canonical = draw.canonical();

        let ciphertext = crypto::encrypt(&canonical, &actor.public_key)?;
        let model = self.store.insert_draw(actor.id, ciphertext, false, 0).await?;

        Ok(SubmittedDraw {
            id: model.id,
            numbers: canonical,
        })
    }

    async fn playable_draws(&self, actor: &User) -> Result<Vec<RevealedDraw>, LotteryError> {
        self.require_role(actor, Role::User).await?;

        let models = self.store.unplayed_draws_for_user(actor.id).await?;
        let mut revealed = Vec::with_capacity(models.len());
        for model in models {
            let numbers = crypto::decrypt(&model.numbers, &actor.private_key)?;
            revealed.push(RevealedDraw {
                id: model.id,
                numbers,
                been_played: model.been_played,
                matches_master: model.matches_master,
                lottery_round: model.lottery_round,
            });
        }

        Ok(revealed)
    }

    async fn played_draws(&self, actor: &User) -> Result<Vec<RevealedDraw>, LotteryError> {
        self.require_role(actor, Role::User).await?;

        let models = self.store.played_draws_for_user(actor.id).await?;
        let mut revealed = Vec::with_capacity(models.len());
        for model in models {
            let numbers = crypto::decrypt(&model.numbers, &actor.private_key)?;
            revealed.push(RevealedDraw {
                id: model.id,
                numbers,
                been_played: model.been_played,
                matches_master: model.matches_master,
                lottery_round: model.lottery_round,
            });
        }

        Ok(revealed)
    }

    async fn purge_played(&self, actor: &User) -> Result<u64, LotteryError> {
        self.require_role(actor, Role::User).await?;
        Ok(self.store.purge_played_draws(actor.id).await?)
    }

    async fn generate_winning_draw(&self, actor: &User) -> Result<WinningDraw, LotteryError> {
        self.require_role(actor, Role::Admin).await?;

        let _round_guard = self.round_lock.lock().await;

        // Replacing the master draw force-expires the previous one even
        // if it was never played; its round number seeds the increment.
        let round = match self.store.master_draw().await? {
            Some(previous) => {
                self.store.delete_master_draw().await?;
                previous.lottery_round + 1
            }
            None => 1,
        };

        let numbers = DrawNumbers::random();
        let canonical = numbers.canonical();
        let ciphertext = crypto::encrypt(&canonical, &actor.public_key)?;

        self.store.insert_draw(actor.id, ciphertext, true, round).await?;

        self.audit(
            "winning_draw_generated",
            &format!("Admin generated winning draw for round {round} [{}]", actor.email),
        )
        .await;
        info!("New winning draw generated for round {round}");

        Ok(WinningDraw {
            round,
            numbers: canonical,
        })
    }

    async fn current_winning_draw(
        &self,
        actor: &User,
    ) -> Result<Option<WinningDraw>, LotteryError> {
        self.require_role(actor, Role::Admin).await?;

        let Some(master) = self.store.unplayed_master_draw().await? else {
            return Ok(None);
        };

        let private_key = self.owner_private_key(master.user_id).await?;
        let numbers = crypto::decrypt(&master.numbers, &private_key)?;

        Ok(Some(WinningDraw {
            round: master.lottery_round,
            numbers,
        }))
    }

    async fn run_round(&self, actor: &User) -> Result<RoundOutcome, LotteryError> {
        self.require_role(actor, Role::Admin).await?;

        let _round_guard = self.round_lock.lock().await;

        let master = self
            .store
            .unplayed_master_draw()
            .await?
            .ok_or(LotteryError::NoActiveRound)?;
        let round = master.lottery_round;

        let user_draws = self.store.unplayed_user_draws().await?;
        if user_draws.is_empty() {
            // Nothing to match; keep the master draw live so it is not
            // wasted on an empty round.
            return Ok(RoundOutcome {
                round,
                draws_played: 0,
                winners: Vec::new(),
                anomalies: Vec::new(),
            });
        }

        // Decrypt the master before committing anything; if its own key
        // material is broken the round must not start.
        let master_key = self.owner_private_key(master.user_id).await?;
        let winning_numbers = crypto::decrypt(&master.numbers, &master_key)?;

        self.store.mark_master_played(master.id).await?;

        let mut key_cache: HashMap<i32, (String, String)> = HashMap::new();
        let mut winners = Vec::new();
        let mut anomalies = Vec::new();
        let mut draws_played = 0usize;

        for draw in user_draws {
            let (private_key, email) = match key_cache.get(&draw.user_id) {
                Some(entry) => entry.clone(),
                None => {
                    let Some(owner) = self.store.get_user_by_id(draw.user_id).await? else {
                        warn!("Draw {} owned by unknown user {}", draw.id, draw.user_id);
                        anomalies.push(DrawAnomaly {
                            draw_id: draw.id,
                            reason: format!("unknown user {}", draw.user_id),
                        });
                        continue;
                    };
                    let entry = (owner.private_key, owner.email);
                    key_cache.insert(draw.user_id, entry.clone());
                    entry
                }
            };

            // Fatal for this draw only: report it and leave it unplayed
            // rather than corrupting the rest of the round.
            let numbers = match crypto::decrypt(&draw.numbers, &private_key) {
                Ok(numbers) => numbers,
                Err(e) => {
                    warn!("Draw {} failed to decrypt during round {round}: {e}", draw.id);
                    self.audit(
                        "draw_decrypt_failed",
                        &format!("Draw {} failed to decrypt during round {round}", draw.id),
                    )
                    .await;
                    anomalies.push(DrawAnomaly {
                        draw_id: draw.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let matches = numbers == winning_numbers;

            // Per-draw commit: one atomic unit per draw
            self.store.mark_draw_played(draw.id, matches, round).await?;
            draws_played += 1;

            if matches {
                winners.push(RoundWinner {
                    round,
                    numbers,
                    user_id: draw.user_id,
                    email,
                });
            }
        }

        self.audit(
            "round_played",
            &format!(
                "Admin ran lottery round {round}: {draws_played} draws, {} winners [{}]",
                winners.len(),
                actor.email
            ),
        )
        .await;
        info!(
            "Round {round} complete: {draws_played} draws played, {} winners, {} anomalies",
            winners.len(),
            anomalies.len()
        );

        Ok(RoundOutcome {
            round,
            draws_played,
            winners,
            anomalies,
        })
    }
}
