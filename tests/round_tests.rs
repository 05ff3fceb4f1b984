//! Round-engine behavior that the HTTP surface cannot reach directly:
//! a draw whose stored ciphertext no longer decrypts.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use tokio::sync::Mutex;

use tombolr::config::SecurityConfig;
use tombolr::db::Store;
use tombolr::entities::draws;
use tombolr::models::{Role, User};
use tombolr::services::{
    LotteryService, Registration, SeaOrmLotteryService, SeaOrmUserService, UserService,
};

/// Seeded admin account (must match m20260815_initial.rs)
const ADMIN_EMAIL: &str = "admin@email.com";

fn cheap_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    }
}

fn registration(email: &str) -> Registration {
    Registration {
        email: email.to_string(),
        first_name: "Bob".to_string(),
        last_name: "Smith".to_string(),
        date_of_birth: "12/03/1990".to_string(),
        postcode: "NE4 5TG".to_string(),
        phone: "0191-123-4567".to_string(),
        password: "Passw0rd!".to_string(),
    }
}

async fn setup() -> (Store, SeaOrmUserService, SeaOrmLotteryService, User) {
    let store = Store::new("sqlite::memory:")
        .await
        .expect("Failed to open in-memory store");

    let users = SeaOrmUserService::new(store.clone(), cheap_security());
    let lottery = SeaOrmLotteryService::new(store.clone(), Arc::new(Mutex::new(())));

    let admin = store
        .get_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .expect("migration seeds the admin account");
    assert_eq!(admin.role, Role::Admin);

    (store, users, lottery, admin)
}

#[tokio::test]
async fn corrupted_draw_is_reported_and_left_unplayed() {
    let (store, users, lottery, admin) = setup().await;

    let p1 = users
        .register(registration("p1@example.com"), Role::User)
        .await
        .unwrap()
        .user;
    let p2 = users
        .register(registration("p2@example.com"), Role::User)
        .await
        .unwrap()
        .user;

    lottery.submit_draw(&p1, &[1, 2, 3, 4, 5, 6]).await.unwrap();
    lottery.submit_draw(&p1, &[7, 8, 9, 10, 11, 12]).await.unwrap();
    let bad = lottery
        .submit_draw(&p2, &[13, 14, 15, 16, 17, 18])
        .await
        .unwrap();

    // Corrupt p2's stored ciphertext behind the service's back
    let model = draws::Entity::find_by_id(bad.id)
        .one(&store.conn)
        .await
        .unwrap()
        .unwrap();
    let mut active: draws::ActiveModel = model.into();
    active.numbers = Set("!!!not-a-ciphertext".to_string());
    active.update(&store.conn).await.unwrap();

    lottery.generate_winning_draw(&admin).await.unwrap();
    let outcome = lottery.run_round(&admin).await.unwrap();

    // The healthy draws play; the broken one is reported, not dropped
    assert_eq!(outcome.draws_played, 2);
    assert_eq!(outcome.anomalies.len(), 1);
    assert_eq!(outcome.anomalies[0].draw_id, bad.id);

    let leftover = store.unplayed_draws_for_user(p2.id).await.unwrap();
    assert_eq!(leftover.len(), 1);
    assert_eq!(leftover[0].id, bad.id);

    // The round itself is consumed
    assert!(store.unplayed_master_draw().await.unwrap().is_none());
}

#[tokio::test]
async fn purge_removes_only_the_callers_played_draws() {
    let (store, users, lottery, admin) = setup().await;

    let p1 = users
        .register(registration("p1@example.com"), Role::User)
        .await
        .unwrap()
        .user;
    let p2 = users
        .register(registration("p2@example.com"), Role::User)
        .await
        .unwrap()
        .user;

    lottery.submit_draw(&p1, &[1, 2, 3, 4, 5, 6]).await.unwrap();
    lottery.submit_draw(&p2, &[7, 8, 9, 10, 11, 12]).await.unwrap();

    lottery.generate_winning_draw(&admin).await.unwrap();
    lottery.run_round(&admin).await.unwrap();

    // A draw submitted after the run stays live for the next round
    lottery.submit_draw(&p1, &[21, 22, 23, 24, 25, 26]).await.unwrap();

    let deleted = lottery.purge_played(&p1).await.unwrap();
    assert_eq!(deleted, 1);

    assert_eq!(store.unplayed_draws_for_user(p1.id).await.unwrap().len(), 1);
    assert_eq!(store.played_draws_for_user(p2.id).await.unwrap().len(), 1);

    // The played master draw is not purgeable by players
    assert!(store.master_draw().await.unwrap().is_some());
}

#[tokio::test]
async fn round_numbers_follow_the_previous_master() {
    let (_store, _users, lottery, admin) = setup().await;

    let first = lottery.generate_winning_draw(&admin).await.unwrap();
    assert_eq!(first.round, 1);

    // Regeneration without a run still advances the counter
    let second = lottery.generate_winning_draw(&admin).await.unwrap();
    assert_eq!(second.round, 2);

    let current = lottery
        .current_winning_draw(&admin)
        .await
        .unwrap()
        .expect("a live master draw");
    assert_eq!(current.round, 2);
    assert_eq!(current.numbers, second.numbers);
}
