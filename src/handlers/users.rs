// src/handlers/users.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdateProfileRequest, User, UserStats},
    response::ApiResponse,
    utils::jwt::Claims,
};

async fn load_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(format!("User not found with id: {}", id)))
}

/// Get the current user's profile.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&pool, claims.user_id()).await?;

    Ok(Json(ApiResponse::success(
        user,
        "User profile retrieved successfully",
    )))
}

/// Update the current user's profile. Only the name fields are editable.
pub async fn update_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = load_user(&pool, claims.user_id()).await?;

    sqlx::query("UPDATE users SET first_name = ?, last_name = ? WHERE id = ?")
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(user.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update profile: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = load_user(&pool, user.id).await?;

    Ok(Json(ApiResponse::success(
        user,
        "User profile updated successfully",
    )))
}

/// Quiz statistics for the current user, over completed attempts.
/// All zeros when the user has not completed anything yet.
pub async fn my_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            COUNT(*) AS total_quizzes_taken,
            COALESCE(AVG(percentage_score), 0.0) AS average_score,
            COALESCE(MAX(percentage_score), 0.0) AS best_score,
            COALESCE(SUM(score_obtained), 0) AS total_points
        FROM quiz_attempts
        WHERE user_id = ? AND status = 'completed'
        "#,
    )
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        stats,
        "User statistics retrieved successfully",
    )))
}

/// Retrieve a user by id. Open to any authenticated caller.
pub async fn get_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&pool, id).await?;

    Ok(Json(ApiResponse::success(
        user,
        "User retrieved successfully",
    )))
}

/// Lists all users. Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(ApiResponse::success(
        users,
        "Users retrieved successfully",
    )))
}
