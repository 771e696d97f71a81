// backend/tests/helpers.rs
#![allow(dead_code)]

use backend::{
    config::{AppConfig, DatabaseConfig, JwtConfig, WebConfig},
    web_server::AppState,
};
use common::{CreateUserRequest, Credentials, Envelope, LoginResponse, UserDto, UserPayload};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "password123";

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
});

pub fn test_config(port: u16) -> AppConfig {
    AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port,
            cors_origin: "http://localhost:5173".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            token_expires_minutes: 60,
        },
    }
}

/// A migrated in-memory database. One connection, so every query sees the same data.
pub async fn test_pool() -> SqlitePool {
    Lazy::force(&TRACING);
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .expect("Failed to create in-memory database pool.");

    backend::db::migrate(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    db_pool
}

/// Spawn a test server and return the address, a reqwest client and the pool.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, SqlitePool) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let db_pool = test_pool().await;
    let app_state = AppState::new(db_pool.clone(), test_config(addr.port()));
    let app = backend::web_server::create_router(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, db_pool)
}

pub fn new_user(name: &str, email: &str) -> CreateUserRequest {
    CreateUserRequest {
        name: Some(name.to_string()),
        lastname: Some("Tester".to_string()),
        email: Some(email.to_string()),
        password: Some(TEST_PASSWORD.to_string()),
        age: Some(30),
    }
}

pub async fn register_user(addr: &SocketAddr, client: &reqwest::Client, name: &str, email: &str) -> UserDto {
    let response = client
        .post(format!("http://{addr}/api/users/create"))
        .json(&new_user(name, email))
        .send()
        .await
        .expect("Failed to register user");
    assert_eq!(response.status(), StatusCode::CREATED, "Registration failed");

    let created: Envelope<UserPayload> = response.json().await.expect("Failed to parse created user");
    created.payload.user
}

pub async fn login(addr: &SocketAddr, client: &reqwest::Client, email: &str) -> LoginResponse {
    let response = client
        .post(format!("http://{addr}/api/users/login"))
        .json(&Credentials {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .send()
        .await
        .expect("Failed to login user");

    assert_eq!(response.status(), StatusCode::OK, "Login request did not return 200 OK");
    response.json().await.expect("Failed to parse login response")
}

/// Registers a user and returns it with a fresh token.
pub async fn signed_in_user(
    addr: &SocketAddr,
    client: &reqwest::Client,
    name: &str,
    email: &str,
) -> (UserDto, String) {
    let user = register_user(addr, client, name, email).await;
    let session = login(addr, client, email).await;
    (user, session.token)
}

/// Same as [`signed_in_user`], with the admin role granted before logging in.
pub async fn signed_in_admin(
    addr: &SocketAddr,
    client: &reqwest::Client,
    db_pool: &SqlitePool,
    email: &str,
) -> (UserDto, String) {
    let user = register_user(addr, client, "Admin", email).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(&user.id)
        .execute(db_pool)
        .await
        .expect("Failed to promote user");
    let session = login(addr, client, email).await;
    (user, session.token)
}
