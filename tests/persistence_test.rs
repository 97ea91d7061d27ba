//! Database-backed integration tests for the persistence rules the
//! router-level tests cannot reach: single-use code consumption, code
//! supersession, the session whitelist and the failed-attempt counter.
//!
//! These run against the schema in `migrations/` and are skipped when
//! neither `TEST_DATABASE_URL` nor `DATABASE_URL` is set.

use auth_service::api::handler::app_router;
use auth_service::api::model::auth::LoginRequest;
use auth_service::db::entity::code::CodePurpose;
use auth_service::db::entity::user::Users;
use auth_service::db::repo::{code_repository, users_repository};
use auth_service::service::auth_service::{issue_token, login};
use auth_service::service::code_service;
use auth_service::service::rate_limit::SlidingWindowLimiter;
use auth_service::service::session_service::{self, ClientInfo};
use auth_service::util::crypto_helper;
use auth_service::AppState;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use nanoid::nanoid;
use secrecy::SecretString;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "test-jwt-secret-for-persistence-tests";
const TEST_ISSUER: &str = "test-issuer";
const TEST_PASSWORD: &str = "Str0ng!Passw0rd";

/// Connects to the test database, or returns `None` so the test can skip
/// when no database is configured.
async fn setup_db_state() -> Option<Arc<AppState>> {
    dotenvy::dotenv().ok();
    let database_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()?;
    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to the test database");
    Some(Arc::new(AppState {
        pg_pool,
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        jwt_issuer: TEST_ISSUER.to_string(),
        jwt_expiration: 3600,
        totp_issuer: "auth-service-test".to_string(),
        rate_limiter: Arc::new(SlidingWindowLimiter::recovery_default()),
    }))
}

fn test_email() -> String {
    format!("test-{}@example.com", nanoid!(10).to_lowercase())
}

fn test_client() -> ClientInfo {
    ClientInfo {
        ip: "127.0.0.1".to_string(),
        device: "Desktop".to_string(),
        user_agent: "integration-tests".to_string(),
    }
}

async fn create_active_user(state: &Arc<AppState>, email: &str) -> Users {
    let password_hash = crypto_helper::hash_password(TEST_PASSWORD).expect("Failed to hash password");
    let mut conn = state
        .pg_pool
        .acquire()
        .await
        .expect("Failed to acquire connection");
    let user = users_repository::create_pending_user(&mut conn, "Test User", email, &password_hash)
        .await
        .expect("Failed to create test user");
    users_repository::activate_user(&mut conn, user.id)
        .await
        .expect("Failed to activate test user");
    user
}

async fn make_request(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    json_body: Option<String>,
) -> Response {
    let mut request_builder = Request::builder().uri(uri).method(method);
    if let Some(token) = bearer {
        request_builder = request_builder.header("Authorization", format!("Bearer {token}"));
    }
    if json_body.is_some() {
        request_builder = request_builder.header("Content-Type", "application/json");
    }
    let request = match json_body {
        Some(body) => request_builder.body(Body::from(body)).unwrap(),
        None => request_builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body was not JSON")
}

#[tokio::test]
async fn consumed_recovery_code_is_single_use() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();

    let code = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::PasswordRecovery,
        code_service::RECOVERY_CODE_TTL,
    )
    .await
    .expect("Failed to issue recovery code");
    assert!(
        code_service::validate(&state.pg_pool, &email, CodePurpose::PasswordRecovery, &code)
            .await
            .unwrap()
    );

    // Redeem it once.
    let mut tx = state.pg_pool.begin().await.unwrap();
    let row = code_repository::lock_valid(&mut tx, &email, CodePurpose::PasswordRecovery, &code)
        .await
        .unwrap()
        .expect("fresh code should lock");
    code_repository::mark_used(&mut tx, row.id).await.unwrap();
    tx.commit().await.unwrap();

    // A consumed code no longer validates and cannot be redeemed again.
    assert!(
        !code_service::validate(&state.pg_pool, &email, CodePurpose::PasswordRecovery, &code)
            .await
            .unwrap()
    );
    let mut tx = state.pg_pool.begin().await.unwrap();
    let again = code_repository::lock_valid(&mut tx, &email, CodePurpose::PasswordRecovery, &code)
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn issuing_a_new_code_invalidates_the_old_one() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();

    let first = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::PasswordRecovery,
        code_service::RECOVERY_CODE_TTL,
    )
    .await
    .unwrap();
    let second = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::PasswordRecovery,
        code_service::RECOVERY_CODE_TTL,
    )
    .await
    .unwrap();
    assert_ne!(first, second);

    assert!(
        !code_service::validate(&state.pg_pool, &email, CodePurpose::PasswordRecovery, &first)
            .await
            .unwrap()
    );
    assert!(
        code_service::validate(&state.pg_pool, &email, CodePurpose::PasswordRecovery, &second)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn revoked_session_is_rejected_despite_valid_signature() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();
    let user = create_active_user(&state, &email).await;
    let token = issue_token(&state, &user).expect("Failed to issue token");

    // Correctly signed and unexpired, but never whitelisted.
    let response = make_request(
        app_router(state.clone()),
        Method::POST,
        "/logout",
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "SESSION_REVOKED");

    // Whitelisted, the same token is accepted.
    session_service::register(&state.pg_pool, user.id, &token, &test_client())
        .await
        .unwrap();
    let response = make_request(
        app_router(state.clone()),
        Method::POST,
        "/logout",
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Logout removed the whitelist row, so the token is dead again.
    assert!(!session_service::is_valid(&state.pg_pool, &token).await.unwrap());
}

#[tokio::test]
async fn revoke_all_except_spares_the_presenting_session() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();
    let user = create_active_user(&state, &email).await;

    let tokens: Vec<String> = (0..3)
        .map(|i| format!("session-token-{}-{}", nanoid!(8), i))
        .collect();
    for token in &tokens {
        session_service::register(&state.pg_pool, user.id, token, &test_client())
            .await
            .unwrap();
    }

    let revoked = session_service::revoke_all_except(&state.pg_pool, user.id, &tokens[1])
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    assert!(!session_service::is_valid(&state.pg_pool, &tokens[0]).await.unwrap());
    assert!(session_service::is_valid(&state.pg_pool, &tokens[1]).await.unwrap());
    assert!(!session_service::is_valid(&state.pg_pool, &tokens[2]).await.unwrap());
}

#[tokio::test]
async fn validate_code_endpoint_rejects_a_wrong_code_with_401() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();
    let code = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::PasswordRecovery,
        code_service::RECOVERY_CODE_TTL,
    )
    .await
    .unwrap();

    let wrong = json!({"email": &email, "code": "0000-0000"});
    let response = make_request(
        app_router(state.clone()),
        Method::POST,
        "/validate-code",
        None,
        Some(wrong.to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let right = json!({"email": &email, "code": &code});
    let response = make_request(
        app_router(state.clone()),
        Method::POST,
        "/validate-code",
        None,
        Some(right.to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn successful_login_resets_the_failed_attempt_counter() {
    let Some(state) = setup_db_state().await else {
        return;
    };
    let email = test_email();
    let user = create_active_user(&state, &email).await;

    // Two wrong guesses, below the lockout threshold.
    for _ in 0..2 {
        users_repository::increment_failed_attempts(&state.pg_pool, user.id)
            .await
            .unwrap();
    }

    let request = LoginRequest {
        email: email.clone(),
        password: TEST_PASSWORD.to_string(),
    };
    let response = login(state.clone(), request, test_client())
        .await
        .expect("login with the correct password should succeed");
    assert_eq!(response.status(), StatusCode::OK);

    let refreshed = users_repository::get_user_by_email(&state.pg_pool, &email)
        .await
        .unwrap();
    assert_eq!(refreshed.failed_login_attempts, 0);
}
