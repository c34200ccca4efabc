// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated quiz statistics for one user, over completed attempts only.
#[derive(Debug, Serialize, FromRow)]
pub struct UserStats {
    pub total_quizzes_taken: i64,
    pub average_score: f64,
    pub best_score: f64,
    pub total_points: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
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
    #[validate(length(max = 50, message = "First name must be at most 50 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name must be at most 50 characters."))]
    pub last_name: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for self-service profile updates. Only names are editable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 50, message = "First name must be at most 50 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name must be at most 50 characters."))]
    pub last_name: Option<String>,
}
