// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::question::PublicQuestion;

/// Represents the 'quiz_attempts' table in the database.
///
/// `total_score` is a snapshot of the quiz's question points taken when the
/// attempt starts and is never recalculated, even if the quiz is edited later.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub score_obtained: Option<i64>,
    pub total_score: i64,
    pub percentage_score: Option<f64>,
    pub is_passed: Option<bool>,

    /// Attempt status: 'in_progress', 'completed' or 'abandoned'.
    pub status: String,

    pub time_taken_minutes: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Attempt row joined with user, quiz and question-count context.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptDto {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub time_limit_minutes: Option<i64>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub score_obtained: Option<i64>,
    pub total_score: i64,
    pub percentage_score: Option<f64>,
    pub is_passed: Option<bool>,
    pub status: String,
    pub time_taken_minutes: Option<i64>,
    pub total_questions: i64,

    /// Per-quiz ordinal, populated on the my-attempts listing only.
    #[sqlx(skip)]
    pub attempt_number: Option<i64>,

    /// Populated when the attempt is read with its answers.
    #[sqlx(skip)]
    pub answers: Option<Vec<AnswerDto>>,

    /// Populated when an attempt is started, with correctness withheld.
    #[sqlx(skip)]
    pub questions: Option<Vec<PublicQuestion>>,
}

/// A graded answer joined with its question's text and explanation.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerDto {
    pub id: i64,
    pub question_id: i64,
    pub question_text: String,
    pub selected_option_ids: Json<Vec<i64>>,
    pub is_correct: bool,
    pub points_earned: i64,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteAttemptRequest {
    pub attempt_id: i64,
}
