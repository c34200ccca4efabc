// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    response::ApiResponse,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let username_taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_one(&pool)
    .await?;

    if username_taken > 0 {
        return Err(AppError::Conflict(format!(
            "Username '{}' already exists",
            payload.username
        )));
    }

    let email_taken =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&payload.email)
            .fetch_one(&pool)
            .await?;

    if email_taken > 0 {
        return Err(AppError::Conflict(format!(
            "Email '{}' already exists",
            payload.email
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password, first_name, last_name)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, username, email, password, first_name, last_name, role, active, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user, "User registered successfully")),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the username and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, first_name, last_name, role, active, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    if !user.active {
        return Err(AppError::AuthError("Account is disabled".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(ApiResponse::success(
        json!({
            "token": token,
            "type": "Bearer",
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        }),
        "Login successful",
    )))
}
