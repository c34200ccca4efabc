// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::User,
    response::ApiResponse,
    utils::{hash::hash_password, jwt::Claims},
};

/// Platform-wide entity counts.
#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_quizzes: i64,
    pub total_questions: i64,
    pub total_attempts: i64,
}

/// Platform statistics. Admin only.
pub async fn admin_stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    let total_quizzes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&pool)
        .await?;
    let total_questions = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await?;
    let total_attempts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_attempts")
        .fetch_one(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        AdminStats {
            total_users,
            total_quizzes,
            total_questions,
            total_attempts,
        },
        "Statistics retrieved successfully",
    )))
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(max = 50))]
    pub first_name: Option<String>,
    #[validate(length(max = 50))]
    pub last_name: Option<String>,
    #[validate(custom(function = validate_role))]
    pub role: String,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        "user" | "admin" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("invalid_role");
            err.message = Some("Role must be 'user' or 'admin'.".into());
            Err(err)
        }
    }
}

/// Creates a new user with an explicit role. Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let username_taken =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(&payload.username)
            .fetch_one(&pool)
            .await?;

    if username_taken > 0 {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let email_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_one(&pool)
        .await?;

    if email_taken > 0 {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password, first_name, last_name, role)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, username, email, password, first_name, last_name, role, active, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create user: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user, "User created successfully")),
    ))
}

/// Deletes a user by ID. Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id() {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(ApiResponse::success(
        serde_json::json!(null),
        "User deleted successfully",
    )))
}
