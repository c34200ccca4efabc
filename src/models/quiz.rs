// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{CreateOptionRequest, PublicQuestion};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub topic: String,

    /// Difficulty level: 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    /// Informational only; never enforced against running attempts.
    pub time_limit_minutes: Option<i64>,

    /// Percentage threshold for passing. No pass/fail verdict when unset.
    pub passing_score: Option<i64>,

    pub active: bool,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Quiz row joined with its creator and question aggregates.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub topic: String,
    pub difficulty: String,
    pub time_limit_minutes: Option<i64>,
    pub passing_score: Option<i64>,
    pub active: bool,
    pub created_by: i64,
    pub created_by_username: String,
    pub total_questions: i64,
    pub total_points: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Populated on detail reads only; correctness flags withheld.
    #[sqlx(skip)]
    pub questions: Option<Vec<PublicQuestion>>,
}

/// DTO for creating or updating a quiz. Questions may be nested on create.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters."))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters."))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Topic must be between 1 and 100 characters."))]
    pub topic: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(range(min = 1, message = "Time limit must be at least one minute."))]
    pub time_limit_minutes: Option<i64>,
    #[validate(range(min = 0, max = 100, message = "Passing score must be a percentage."))]
    pub passing_score: Option<i64>,
    pub active: Option<bool>,
    #[validate(nested)]
    pub questions: Option<Vec<QuestionInQuizRequest>>,
}

/// A question nested inside a quiz creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionInQuizRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    #[validate(custom(function = crate::models::question::validate_question_type))]
    pub question_type: String,
    #[validate(range(min = 1, message = "Points must be positive."))]
    pub points: i64,
    pub question_order: Option<i64>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(nested)]
    pub options: Vec<CreateOptionRequest>,
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    match difficulty {
        "easy" | "medium" | "hard" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("invalid_difficulty");
            err.message = Some("Difficulty must be 'easy', 'medium' or 'hard'.".into());
            Err(err)
        }
    }
}
