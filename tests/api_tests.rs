use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tombolr::config::Config;
use totp_rs::{Secret, TOTP};
use tower::ServiceExt;

/// Seeded admin account (must match m20260815_initial.rs)
const ADMIN_EMAIL: &str = "admin@email.com";
const ADMIN_PASSWORD: &str = "Admin1!";
const ADMIN_TOTP_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
const ADMIN_POSTCODE: &str = "NE1 7RU";

const PLAYER_PASSWORD: &str = "Passw0rd!";
const PLAYER_POSTCODE: &str = "NE4 5TG";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Cheap hashing params keep the suite fast; the policy itself is
    // covered by unit tests.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = tombolr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    tombolr::api::router(state).await
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Current PIN for a base32 secret, the same way an authenticator app
/// derives it from the provisioning URI.
fn totp_code(secret_base32: &str) -> String {
    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .expect("valid base32 secret");
    TOTP::new(
        totp_rs::Algorithm::SHA1,
        6,
        1,
        30,
        secret,
        Some("Tombolr".to_string()),
        "login".to_string(),
    )
    .expect("valid TOTP params")
    .generate_current()
    .expect("system clock")
}

fn secret_from_uri(uri: &str) -> String {
    uri.split("secret=")
        .nth(1)
        .expect("provisioning URI carries a secret")
        .split('&')
        .next()
        .unwrap()
        .to_string()
}

/// Registers a player account and returns its TOTP secret.
async fn register_player(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "first_name": "Bob",
                "last_name": "Smith",
                "date_of_birth": "12/03/1990",
                "postcode": PLAYER_POSTCODE,
                "phone": "0191-123-4567",
                "password": PLAYER_PASSWORD,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    secret_from_uri(body["data"]["provisioning_uri"].as_str().unwrap())
}

/// Logs in with all three factors and returns the session cookie.
async fn login(
    app: &Router,
    email: &str,
    password: &str,
    secret: &str,
    postcode: &str,
) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "pin": totp_code(secret),
                "postcode": postcode,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("login sets a session cookie")
}

async fn login_admin(app: &Router) -> String {
    login(
        app,
        ADMIN_EMAIL,
        ADMIN_PASSWORD,
        ADMIN_TOTP_SECRET,
        ADMIN_POSTCODE,
    )
    .await
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let app = spawn_app().await;

    for uri in [
        "/api/auth/me",
        "/api/lottery/draws",
        "/api/lottery/results",
        "/api/admin/users",
        "/api/admin/winning-draw",
    ] {
        let response = app
            .clone()
            .oneshot(request("GET", uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_registration_validation_and_duplicates() {
    let app = spawn_app().await;

    let mut bad = json!({
        "email": "not-an-email",
        "first_name": "Bob",
        "last_name": "Smith",
        "date_of_birth": "12/03/1990",
        "postcode": PLAYER_POSTCODE,
        "phone": "0191-123-4567",
        "password": PLAYER_PASSWORD,
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/auth/register", None, Some(bad.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    bad["email"] = json!("bob@example.com");
    bad["password"] = json!("weak");
    let response = app
        .clone()
        .oneshot(request("POST", "/api/auth/register", None, Some(bad)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A valid registration, then the same email again
    register_player(&app, "bob@example.com").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "bob@example.com",
                "first_name": "Other",
                "last_name": "Bob",
                "date_of_birth": "01/01/1991",
                "postcode": PLAYER_POSTCODE,
                "phone": "0191-123-9999",
                "password": PLAYER_PASSWORD,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_requires_every_factor() {
    let app = spawn_app().await;
    let secret = register_player(&app, "carol@example.com").await;

    // Wrong password, wrong PIN, wrong postcode: same generic rejection
    let cases = [
        ("WrongPw1!", totp_code(&secret), PLAYER_POSTCODE),
        (PLAYER_PASSWORD, "000000".to_string(), PLAYER_POSTCODE),
        (PLAYER_PASSWORD, totp_code(&secret), "SW1A 1AA"),
    ];
    for (password, pin, postcode) in cases {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({
                    "email": "carol@example.com",
                    "password": password,
                    "pin": pin,
                    "postcode": postcode,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid credentials");
    }

    // All three factors correct
    let cookie = login(
        &app,
        "carol@example.com",
        PLAYER_PASSWORD,
        &secret,
        PLAYER_POSTCODE,
    )
    .await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/auth/me", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "carol@example.com");
    assert_eq!(body["data"]["role"], "user");
    // Secrets never leave the service
    assert!(body["data"].get("password_hash").is_none());
    assert!(body["data"].get("totp_secret").is_none());
}

#[tokio::test]
async fn test_session_lockout_and_reset() {
    let app = spawn_app().await;
    let secret = register_player(&app, "dave@example.com").await;

    let bad_attempt = json!({
        "email": "dave@example.com",
        "password": "WrongPw1!",
        "pin": "000000",
        "postcode": PLAYER_POSTCODE,
    });

    // First failure creates the session carrying the attempt counter
    let response = app
        .clone()
        .oneshot(request("POST", "/api/auth/login", None, Some(bad_attempt.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = session_cookie(&response).expect("failed login still sets a session cookie");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            Some(&cookie),
            Some(bad_attempt.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Third strike locks the session
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            Some(&cookie),
            Some(bad_attempt.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::LOCKED);

    // Correct credentials are refused while locked
    let good_attempt = json!({
        "email": "dave@example.com",
        "password": PLAYER_PASSWORD,
        "pin": totp_code(&secret),
        "postcode": PLAYER_POSTCODE,
    });
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            Some(&cookie),
            Some(good_attempt.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::LOCKED);

    // Explicit reset reopens the session
    let response = app
        .clone()
        .oneshot(request("POST", "/api/auth/reset-lockout", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            Some(&cookie),
            Some(json!({
                "email": "dave@example.com",
                "password": PLAYER_PASSWORD,
                "pin": totp_code(&secret),
                "postcode": PLAYER_POSTCODE,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_submit_and_reveal_draws() {
    let app = spawn_app().await;
    let secret = register_player(&app, "erin@example.com").await;
    let cookie = login(
        &app,
        "erin@example.com",
        PLAYER_PASSWORD,
        &secret,
        PLAYER_POSTCODE,
    )
    .await;

    // Unsorted input comes back in canonical sorted form
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/lottery/draws",
            Some(&cookie),
            Some(json!({ "numbers": [42, 7, 1, 60, 23, 11] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["numbers"], "1 7 11 23 42 60");

    for bad in [
        json!({ "numbers": [1, 2, 3, 4, 5] }),
        json!({ "numbers": [1, 2, 3, 4, 5, 61] }),
        json!({ "numbers": [0, 2, 3, 4, 5, 6] }),
        json!({ "numbers": [1, 1, 3, 4, 5, 6] }),
    ] {
        let response = app
            .clone()
            .oneshot(request("POST", "/api/lottery/draws", Some(&cookie), Some(bad)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Stored encrypted, revealed as plaintext on read
    let response = app
        .clone()
        .oneshot(request("GET", "/api/lottery/draws", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let draws = body["data"].as_array().unwrap();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0]["numbers"], "1 7 11 23 42 60");
    assert_eq!(draws[0]["been_played"], false);

    // Nothing played yet
    let response = app
        .clone()
        .oneshot(request("GET", "/api/lottery/results", Some(&cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_role_gating() {
    let app = spawn_app().await;
    let secret = register_player(&app, "frank@example.com").await;
    let player_cookie = login(
        &app,
        "frank@example.com",
        PLAYER_PASSWORD,
        &secret,
        PLAYER_POSTCODE,
    )
    .await;
    let admin_cookie = login_admin(&app).await;

    // Players cannot reach admin operations
    for (method, uri) in [
        ("POST", "/api/admin/winning-draw"),
        ("GET", "/api/admin/winning-draw"),
        ("POST", "/api/admin/run-lottery"),
        ("GET", "/api/admin/users"),
        ("GET", "/api/admin/activity"),
        ("GET", "/api/admin/logs"),
    ] {
        let response = app
            .clone()
            .oneshot(request(method, uri, Some(&player_cookie), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
    }

    // Admins do not play; draw submission is player-only
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/lottery/draws",
            Some(&admin_cookie),
            Some(json!({ "numbers": [1, 2, 3, 4, 5, 6] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_regenerating_winning_draw_advances_round() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    // No master draw yet
    let response = app
        .clone()
        .oneshot(request("GET", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["round"], 1);

    // Regeneration force-expires the previous master and bumps the round
    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["round"], 2);
    let numbers = body["data"]["numbers"].as_str().unwrap().to_string();

    // Exactly one live master remains, decrypting to the same numbers
    let response = app
        .clone()
        .oneshot(request("GET", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["round"], 2);
    assert_eq!(body["data"]["numbers"], numbers);

    let parsed: Vec<i64> = numbers
        .split(' ')
        .map(|n| n.parse().unwrap())
        .collect();
    assert_eq!(parsed.len(), 6);
    assert!(parsed.windows(2).all(|w| w[0] < w[1]));
    assert!(parsed.iter().all(|n| (1..=60).contains(n)));
}

#[tokio::test]
async fn test_empty_round_keeps_master_live() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    // Running with no master at all is refused
    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/run-lottery", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No user draws: the round does not advance
    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/run-lottery", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["draws_played"], 0);
    assert!(body["data"]["winners"].as_array().unwrap().is_empty());

    // The master draw is still live for the next run
    let response = app
        .clone()
        .oneshot(request("GET", "/api/admin/winning-draw", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["round"], 1);
}

#[tokio::test]
async fn test_full_round_with_winner() {
    let app = spawn_app().await;
    let admin_cookie = login_admin(&app).await;
    let secret = register_player(&app, "grace@example.com").await;
    let player_cookie = login(
        &app,
        "grace@example.com",
        PLAYER_PASSWORD,
        &secret,
        PLAYER_POSTCODE,
    )
    .await;

    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/winning-draw", Some(&admin_cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let winning: Vec<i64> = body["data"]["numbers"]
        .as_str()
        .unwrap()
        .split(' ')
        .map(|n| n.parse().unwrap())
        .collect();
    let losing: Vec<i64> = if winning == [1, 2, 3, 4, 5, 6] {
        vec![7, 8, 9, 10, 11, 12]
    } else {
        vec![1, 2, 3, 4, 5, 6]
    };

    for numbers in [&winning, &losing] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/lottery/draws",
                Some(&player_cookie),
                Some(json!({ "numbers": numbers })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/run-lottery", Some(&admin_cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["round"], 1);
    assert_eq!(body["data"]["draws_played"], 2);
    assert!(body["data"]["anomalies"].as_array().unwrap().is_empty());

    let winners = body["data"]["winners"].as_array().unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0]["email"], "grace@example.com");

    // Both draws moved to the played side with their results
    let response = app
        .clone()
        .oneshot(request("GET", "/api/lottery/draws", Some(&player_cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(request("GET", "/api/lottery/results", Some(&player_cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    let matched: Vec<bool> = results
        .iter()
        .map(|d| d["matches_master"].as_bool().unwrap())
        .collect();
    assert_eq!(matched.iter().filter(|m| **m).count(), 1);
    assert!(results.iter().all(|d| d["lottery_round"] == 1));

    // The master is consumed; a new one is needed before the next run
    let response = app
        .clone()
        .oneshot(request("POST", "/api/admin/run-lottery", Some(&admin_cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // "Play again" clears the played draws
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/lottery/draws/played",
            Some(&player_cookie),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["deleted"], 2);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/lottery/results", Some(&player_cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_security_log_records_failed_logins() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({
                "email": "nobody@example.com",
                "password": "WrongPw1!",
                "pin": "000000",
                "postcode": "XX1 1XX",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = login_admin(&app).await;
    let response = app
        .clone()
        .oneshot(request("GET", "/api/admin/logs?limit=50", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let logs = body["data"].as_array().unwrap();
    assert!(
        logs.iter()
            .any(|entry| entry["event_type"] == "login_failed"
                && entry["message"].as_str().unwrap().contains("nobody@example.com"))
    );
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(request("POST", "/api/auth/logout", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/auth/me", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
