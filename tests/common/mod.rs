// tests/common/mod.rs

#![allow(dead_code)]

use quiz_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Spawns the app on a random port over a fresh in-memory database.
/// Returns the base URL and a handle on the pool for direct seeding.
pub async fn spawn_app() -> (String, SqlitePool) {
    // A single pinned connection keeps the in-memory database alive for
    // the whole test.
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user and returns their bearer token.
pub async fn register_and_login(
    address: &str,
    client: &reqwest::Client,
    username: &str,
) -> String {
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute register request");
    assert_eq!(response.status().as_u16(), 201);

    login(address, client, username).await
}

/// Registers a user, promotes them to admin directly in the database, and
/// returns a token carrying the admin role.
pub async fn register_admin(
    address: &str,
    client: &reqwest::Client,
    pool: &SqlitePool,
    username: &str,
) -> String {
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
        .bind(username)
        .execute(pool)
        .await
        .unwrap();

    login(address, client, username).await
}

async fn login(address: &str, client: &reqwest::Client, username: &str) -> String {
    let response = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute login request");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Creates a quiz with two questions through the API and returns its id.
///
/// Question 1: single choice, 5 points, first option correct.
/// Question 2: multiple choice, 5 points, first two options correct.
pub async fn create_fixture_quiz(
    address: &str,
    client: &reqwest::Client,
    admin_token: &str,
) -> i64 {
    let response = client
        .post(&format!("{}/api/quizzes", address))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({
            "title": "Rust fundamentals",
            "description": "Ownership, borrowing and the rest",
            "topic": "rust",
            "difficulty": "medium",
            "time_limit_minutes": 30,
            "passing_score": 60,
            "questions": [
                {
                    "question_text": "Which keyword declares an immutable binding?",
                    "question_type": "single_choice",
                    "points": 5,
                    "options": [
                        {"option_text": "let", "is_correct": true},
                        {"option_text": "mut", "is_correct": false},
                        {"option_text": "static", "is_correct": false}
                    ]
                },
                {
                    "question_text": "Which types are heap-allocated?",
                    "question_type": "multiple_choice",
                    "points": 5,
                    "options": [
                        {"option_text": "String", "is_correct": true},
                        {"option_text": "Vec<u8>", "is_correct": true},
                        {"option_text": "u32", "is_correct": false}
                    ]
                }
            ]
        }))
        .send()
        .await
        .expect("Failed to create quiz");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

/// Option ids of a question, in display order.
pub async fn option_ids(pool: &SqlitePool, question_id: i64) -> Vec<i64> {
    sqlx::query_scalar(
        "SELECT id FROM question_options WHERE question_id = ? ORDER BY option_order, id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

/// Question ids of a quiz, in display order.
pub async fn question_ids(pool: &SqlitePool, quiz_id: i64) -> Vec<i64> {
    sqlx::query_scalar("SELECT id FROM questions WHERE quiz_id = ? ORDER BY question_order, id")
        .bind(quiz_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
