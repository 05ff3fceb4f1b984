//! Domain service for the encrypted-draw lifecycle and lottery rounds.

use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::models::{DrawNumbersError, User};

#[derive(Debug, Error)]
pub enum LotteryError {
    #[error("{0}")]
    Validation(#[from] DrawNumbersError),

    /// No unplayed master draw exists; an admin must generate one.
    #[error("No active winning draw")]
    NoActiveRound,

    #[error("Insufficient role for this operation")]
    Forbidden,

    #[error("Crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Unknown user {0}")]
    UnknownUser(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LotteryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LotteryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A freshly submitted draw, echoed back in canonical plaintext form.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedDraw {
    pub id: i32,
    pub numbers: String,
}

/// A stored draw decrypted for display. Plaintext never goes back to
/// durable storage; this is a read-time view.
#[derive(Debug, Clone, Serialize)]
pub struct RevealedDraw {
    pub id: i32,
    pub numbers: String,
    pub been_played: bool,
    pub matches_master: bool,
    pub lottery_round: i32,
}

/// The current winning draw, decrypted for the admin view.
#[derive(Debug, Clone, Serialize)]
pub struct WinningDraw {
    pub round: i32,
    pub numbers: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundWinner {
    pub round: i32,
    pub numbers: String,
    pub user_id: i32,
    pub email: String,
}

/// A draw the round run could not process. Reported, never silently
/// dropped; the draw itself is left unplayed for manual follow-up.
#[derive(Debug, Clone, Serialize)]
pub struct DrawAnomaly {
    pub draw_id: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundOutcome {
    pub round: i32,
    /// Draws marked played this run. 0 means the round did not advance
    /// and the master draw is still live.
    pub draws_played: usize,
    pub winners: Vec<RoundWinner>,
    pub anomalies: Vec<DrawAnomaly>,
}

#[async_trait::async_trait]
pub trait LotteryService: Send + Sync {
    /// Validates, canonicalizes and encrypts a player's numbers under
    /// their own public key, persisting an unplayed round-0 draw.
    async fn submit_draw(&self, actor: &User, numbers: &[i64])
    -> Result<SubmittedDraw, LotteryError>;

    /// The actor's unplayed draws, decrypted for display.
    async fn playable_draws(&self, actor: &User) -> Result<Vec<RevealedDraw>, LotteryError>;

    /// The actor's played draws with their round results.
    async fn played_draws(&self, actor: &User) -> Result<Vec<RevealedDraw>, LotteryError>;

    /// Deletes the actor's played, non-master draws. Irreversible.
    async fn purge_played(&self, actor: &User) -> Result<u64, LotteryError>;

    /// Replaces the master draw (force-expiring any previous one) with
    /// freshly sampled winning numbers, advancing the round counter.
    /// Admin only.
    async fn generate_winning_draw(&self, actor: &User) -> Result<WinningDraw, LotteryError>;

    /// The current unplayed winning draw, decrypted. Admin only.
    async fn current_winning_draw(&self, actor: &User)
    -> Result<Option<WinningDraw>, LotteryError>;

    /// Plays the round: matches every unplayed user draw against the
    /// master draw. Admin only.
    ///
    /// # Errors
    ///
    /// [`LotteryError::NoActiveRound`] when no unplayed master draw
    /// exists; nothing is mutated in that case.
    async fn run_round(&self, actor: &User) -> Result<RoundOutcome, LotteryError>;
}
