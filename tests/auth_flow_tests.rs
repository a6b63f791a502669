mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TEST_SECRET, spawn_app};
use fonokids::constants::mail::RESET_SUBJECT;
use fonokids::entities::{password_reset_codes, patients};
use fonokids::security::TokenIssuer;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;

#[tokio::test]
async fn test_create_user_returns_public_view() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/auth/create-user",
            json!({
                "username": "sofia",
                "email": "sofia@example.com",
                "password": "secreto123",
                "nombre_completo": "Sofía Rojas",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "sofia");
    assert_eq!(body["data"]["email"], "sofia@example.com");
    assert_eq!(body["data"]["name"], "Sofía Rojas");
    assert!(body["data"].get("password_hash").is_none());
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_create_user_conflicts() {
    let app = spawn_app().await;
    app.register("tomas", "tomas@example.com", "pw-tomas").await;

    let (status, body) = app
        .post(
            "/api/auth/create-user",
            json!({
                "username": "otro",
                "email": "tomas@example.com",
                "password": "pw",
                "full_name": "Otro",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Username or email already exists");

    let (status, _) = app
        .post(
            "/api/auth/create-user",
            json!({
                "username": "tomas",
                "email": "distinto@example.com",
                "password": "pw",
                "full_name": "Tomás",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identifiers_are_unique_across_columns() {
    let app = spawn_app().await;
    let id = app.register("sofia", "sofia@example.com", "pw-sofia").await;

    for (username, email) in [
        ("sofia@example.com", "otra@example.com"),
        ("otra", "sofia"),
    ] {
        let (status, body) = app
            .post(
                "/api/auth/create-user",
                json!({
                    "username": username,
                    "email": email,
                    "password": "pw",
                    "full_name": "Otra",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{username}/{email}");
        assert_eq!(body["error"], "Username or email already exists");
    }

    let (_, body) = app.login("sofia@example.com", "pw-sofia").await;
    assert_eq!(body["data"]["user"]["id"], id);
}

#[tokio::test]
async fn test_create_user_requires_all_fields() {
    let app = spawn_app().await;

    for payload in [
        json!({ "username": "a", "email": "a@example.com", "password": "pw" }),
        json!({ "username": "  ", "email": "a@example.com", "password": "pw", "full_name": "A" }),
        json!({ "username": "a", "email": null, "password": "pw", "full_name": "A" }),
    ] {
        let (status, body) = app.post("/api/auth/create-user", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");
    }
}

#[tokio::test]
async fn test_login_with_username_or_email() {
    let app = spawn_app().await;
    let id = app.register("lucas", "lucas@example.com", "pw-lucas").await;

    for login in ["lucas", "lucas@example.com"] {
        let (status, body) = app.login(login, "pw-lucas").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
        assert_eq!(body["data"]["user"]["id"], id);
        assert_eq!(body["data"]["user"]["name"], "lucas Test");
    }
}

#[tokio::test]
async fn test_login_failures_do_not_reveal_accounts() {
    let app = spawn_app().await;
    app.register("mia", "mia@example.com", "pw-mia").await;

    let (wrong_status, wrong_body) = app.login("mia", "not-it").await;
    let (unknown_status, unknown_body) = app.login("nadie", "not-it").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["error"], unknown_body["error"]);
    assert_eq!(wrong_body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_requires_fields() {
    let app = spawn_app().await;

    let (status, body) = app.post("/api/auth/login", json!({ "username": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password are required");

    let (status, _) = app.login("", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_passwords_are_not_trimmed() {
    let app = spawn_app().await;
    app.register("nico", "nico@example.com", "   ").await;

    let (status, _) = app.login("nico", "   ").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.login("nico", " ").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let code = app.request_code("nico@example.com").await;
    let (status, body) = app.reset("nico@example.com", &code, " new pw ").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(app.login("nico", " new pw ").await.0, StatusCode::OK);
    assert_eq!(app.login("nico", "new pw").await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let app = spawn_app().await;

    for (content_type, body) in [
        (Some("application/json"), r#"{"username": 5, "password": "x"}"#),
        (Some("application/json"), r#"{"username": "ana", "#),
        (Some("text/plain"), r#"{"username": "ana", "password": "x"}"#),
        (None, r#"{"username": "ana", "password": "x"}"#),
    ] {
        let (status, body) = app.post_raw("/api/auth/login", content_type, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["success"], false);
        assert!(
            body["error"].as_str().unwrap().starts_with("Invalid request body"),
            "{body}"
        );
    }
}

#[tokio::test]
async fn test_login_without_password_hash() {
    let app = spawn_app().await;
    let now = app.clock_now();

    patients::ActiveModel {
        username: Set("legado".to_string()),
        email: Set("legado@example.com".to_string()),
        password_hash: Set(None),
        full_name: Set("Paciente Legado".to_string()),
        active: Set(true),
        registered_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&app.state.store().conn)
    .await
    .unwrap();

    let (status, body) = app.login("legado", "anything").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account has no password set");
}

#[tokio::test]
async fn test_forgot_password_sends_code() {
    let app = spawn_app().await;
    app.register("ana", "ana@example.com", "pw-ana").await;

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            json!({ "email": "ana@example.com" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in_minutes"], 10);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ana@example.com");
    assert_eq!(sent[0].subject, RESET_SUBJECT);
    assert!(sent[0].body.contains("ana Test"));

    let code = sent[0].code();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(app.verify_code("ana@example.com", &code).await, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(app.notifier.sent().is_empty());

    let (status, _) = app
        .post("/api/auth/forgot-password", json!({ "email": " " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reissue_invalidates_previous_code() {
    let app = spawn_app().await;
    app.register("leo", "leo@example.com", "pw-leo").await;

    let first = app.request_code("leo@example.com").await;
    let second = app.request_code("leo@example.com").await;

    assert_eq!(app.verify_code("leo@example.com", &second).await, StatusCode::OK);
    if first != second {
        assert_eq!(
            app.verify_code("leo@example.com", &first).await,
            StatusCode::BAD_REQUEST
        );
    }

    let rows = password_reset_codes::Entity::find()
        .count(&app.state.store().conn)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_code_expires_after_ten_minutes() {
    let app = spawn_app().await;
    app.register("eva", "eva@example.com", "pw-eva").await;
    let code = app.request_code("eva@example.com").await;

    app.clock.advance(Duration::minutes(5));
    assert_eq!(app.verify_code("eva@example.com", &code).await, StatusCode::OK);

    app.clock.advance(Duration::minutes(6));
    let (status, body) = app
        .post(
            "/api/auth/verify-reset-code",
            json!({ "email": "eva@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired code");

    let (status, _) = app.reset("eva@example.com", &code, "nueva").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.login("eva", "pw-eva").await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_code_expiry_boundary() {
    let app = spawn_app().await;
    app.register("ian", "ian@example.com", "pw-ian").await;
    let code = app.request_code("ian@example.com").await;

    app.clock
        .advance(Duration::minutes(10) - Duration::milliseconds(1));
    assert_eq!(app.verify_code("ian@example.com", &code).await, StatusCode::OK);

    app.clock.advance(Duration::milliseconds(1));
    assert_eq!(
        app.verify_code("ian@example.com", &code).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_reset_password_flow() {
    let app = spawn_app().await;
    app.register("olga", "olga@example.com", "vieja").await;
    let code = app.request_code("olga@example.com").await;

    app.clock.advance(Duration::minutes(5));
    let (status, body) = app
        .post(
            "/api/auth/reset-password",
            json!({ "email": "olga@example.com", "code": code, "newPassword": "nueva" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let (status, _) = app.reset("olga@example.com", &code, "otra").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.verify_code("olga@example.com", &code).await,
        StatusCode::BAD_REQUEST
    );

    assert_eq!(app.login("olga", "nueva").await.0, StatusCode::OK);
    assert_eq!(app.login("olga", "vieja").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("olga", "otra").await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_requires_matching_email() {
    let app = spawn_app().await;
    app.register("pia", "pia@example.com", "pw-pia").await;
    app.register("rui", "rui@example.com", "pw-rui").await;
    let code = app.request_code("pia@example.com").await;

    let (status, _) = app.reset("rui@example.com", &code, "robada").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.login("rui", "pw-rui").await.0, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/auth/reset-password",
            json!({ "email": "pia@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");
}

#[tokio::test]
async fn test_concurrent_resets_with_one_code() {
    let app = spawn_app().await;
    app.register("vera", "vera@example.com", "pw-vera").await;
    let code = app.request_code("vera@example.com").await;

    let (first, second) = tokio::join!(
        app.reset("vera@example.com", &code, "primera"),
        app.reset("vera@example.com", &code, "segunda"),
    );

    let successes = [first.0, second.0]
        .iter()
        .filter(|status| **status == StatusCode::OK)
        .count();
    assert_eq!(successes, 1);

    let winner = if first.0 == StatusCode::OK {
        "primera"
    } else {
        "segunda"
    };
    assert_eq!(app.login("vera", winner).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_issue_leaves_one_code() {
    let app = spawn_app().await;
    app.register("zoe", "zoe@example.com", "pw-zoe").await;

    let (a, b) = tokio::join!(
        app.post(
            "/api/auth/forgot-password",
            json!({ "email": "zoe@example.com" })
        ),
        app.post(
            "/api/auth/forgot-password",
            json!({ "email": "zoe@example.com" })
        ),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    let rows = password_reset_codes::Entity::find()
        .count(&app.state.store().conn)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_delivery_failure_keeps_code() {
    let app = spawn_app().await;
    app.register("nico", "nico@example.com", "pw-nico").await;
    app.notifier.set_failing(true);

    let (status, body) = app
        .post(
            "/api/auth/forgot-password",
            json!({ "email": "nico@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let code = app.notifier.last().code();
    assert_eq!(app.verify_code("nico@example.com", &code).await, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_requires_bearer_token() {
    let app = spawn_app().await;
    let id = app.register("bruno", "bruno@example.com", "pw-bruno").await;

    let (status, body) = app.get("/api/auth/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, _) = app.get("/api/auth/profile", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let forged = TokenIssuer::new("some-other-secret")
        .issue(
            i32::try_from(id).unwrap(),
            "bruno",
            "bruno@example.com",
            chrono::Utc::now(),
        )
        .unwrap();
    let (status, _) = app.get("/api/auth/profile", Some(&forged)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = app.token("bruno", "pw-bruno").await;
    let (status, body) = app.get("/api/auth/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["username"], "bruno");
    assert!(body["data"].get("password_hash").is_none());

    let own = TokenIssuer::new(TEST_SECRET)
        .issue(
            i32::try_from(id).unwrap(),
            "bruno",
            "bruno@example.com",
            app.clock_now_utc(),
        )
        .unwrap();
    assert_eq!(app.get("/api/auth/profile", Some(&own)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_token_expires_after_a_day() {
    let app = spawn_app().await;
    app.register("dana", "dana@example.com", "pw-dana").await;
    let token = app.token("dana", "pw-dana").await;

    app.clock.advance(Duration::hours(23));
    assert_eq!(app.get("/api/auth/profile", Some(&token)).await.0, StatusCode::OK);

    app.clock.advance(Duration::hours(1));
    let (status, body) = app.get("/api/auth/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or expired token");
}
