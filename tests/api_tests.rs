// tests/api_tests.rs

use quiz_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and a handle on
/// the pool so tests can seed or inspect rows directly.
async fn spawn_app() -> (String, SqlitePool) {
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
        jwt_expiration: 600, // 10 minutes for tests
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

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user and returns their bearer token.
async fn register_and_login(address: &str, client: &reqwest::Client, username: &str) -> String {
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

/// Registers a user, promotes them to admin directly in the database, and
/// returns a token carrying the admin role.
async fn register_admin(
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

    let response = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_and_hides_password() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], username.as_str());
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation_with_field_map() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Username too short, email malformed
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "email": "not-an-email",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    assert!(body["data"]["username"].is_string());
    assert!(body["data"]["email"].is_string());
}

#[tokio::test]
async fn register_duplicate_username_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("dup");

    for expected in [201, 409] {
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
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");
    register_and_login(&address, &client, &username).await;

    let response = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "wrong_password"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/users/me", address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_are_forbidden_for_plain_users() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client, &unique_name("u")).await;

    let response = client
        .get(&format!("{}/api/admin/stats", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn profile_read_and_update() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");
    let token = register_and_login(&address, &client, &username).await;

    let response = client
        .get(&format!("{}/api/users/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], username.as_str());

    let response = client
        .put(&format!("{}/api/users/me", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["first_name"], "Ada");
    assert_eq!(body["data"]["last_name"], "Lovelace");
}

#[tokio::test]
async fn stats_are_zero_for_new_users() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client, &unique_name("u")).await;

    let response = client
        .get(&format!("{}/api/users/me/stats", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_quizzes_taken"], 0);
    assert_eq!(body["data"]["total_points"], 0);
    assert_eq!(body["data"]["average_score"], 0.0);
}

#[tokio::test]
async fn admin_can_manage_users() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = register_admin(&address, &client, &pool, &unique_name("adm")).await;

    // Create a user with an explicit role
    let username = unique_name("staff");
    let response = client
        .post(&format!("{}/api/admin/users", address))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let created_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["role"], "admin");

    // Listing includes the new user
    let response = client
        .get(&format!("{}/api/admin/users", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().len() >= 2);

    // Deleting the new user works, deleting a missing id is a 404
    let response = client
        .delete(&format!("{}/api/admin/users/{}", address, created_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .delete(&format!("{}/api/admin/users/{}", address, created_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_cannot_delete_own_account() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("adm");
    let admin_token = register_admin(&address, &client, &pool, &username).await;

    let admin_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(&pool)
        .await
        .unwrap();

    let response = client
        .delete(&format!("{}/api/admin/users/{}", address, admin_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_stats_count_entities() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = register_admin(&address, &client, &pool, &unique_name("adm")).await;
    register_and_login(&address, &client, &unique_name("u")).await;

    let response = client
        .get(&format!("{}/api/admin/stats", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_users"], 2);
    assert_eq!(body["data"]["total_quizzes"], 0);
    assert_eq!(body["data"]["total_attempts"], 0);
}
