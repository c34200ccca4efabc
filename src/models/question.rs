// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// Question type: 'single_choice' or 'multiple_choice'.
    pub question_type: String,

    pub points: i64,
    pub question_order: i64,

    /// Shown alongside graded answers.
    pub explanation: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'question_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
    pub option_order: i64,
}

/// Author-facing question view, options with correctness flags.
#[derive(Debug, Serialize)]
pub struct QuestionDto {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub question_type: String,
    pub points: i64,
    pub question_order: i64,
    pub explanation: Option<String>,
    pub options: Vec<OptionDto>,
}

#[derive(Debug, Serialize)]
pub struct OptionDto {
    pub id: i64,
    pub option_text: String,
    pub is_correct: bool,
    pub option_order: i64,
}

/// Taker-facing question view: correctness flags and explanation withheld.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub question_type: String,
    pub points: i64,
    pub question_order: i64,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub option_text: String,
    pub option_order: i64,
}

impl QuestionDto {
    pub fn from_parts(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            question_type: question.question_type,
            points: question.points,
            question_order: question.question_order,
            explanation: question.explanation,
            options: options
                .into_iter()
                .map(|o| OptionDto {
                    id: o.id,
                    option_text: o.option_text,
                    is_correct: o.is_correct,
                    option_order: o.option_order,
                })
                .collect(),
        }
    }
}

impl PublicQuestion {
    pub fn from_parts(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text,
            question_type: question.question_type,
            points: question.points,
            question_order: question.question_order,
            options: options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    option_text: o.option_text,
                    option_order: o.option_order,
                })
                .collect(),
        }
    }
}

/// DTO for creating a new question on an existing quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub quiz_id: i64,
    #[validate(length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."))]
    pub question_text: String,
    #[validate(custom(function = validate_question_type))]
    pub question_type: String,
    #[validate(range(min = 1, message = "Points must be positive."))]
    pub points: i64,
    pub question_order: Option<i64>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, message = "A question needs at least one option."))]
    #[validate(nested)]
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500, message = "Option text must be between 1 and 500 characters."))]
    pub option_text: String,
    pub is_correct: bool,
    pub option_order: Option<i64>,
}

pub fn validate_question_type(question_type: &str) -> Result<(), validator::ValidationError> {
    match question_type {
        "single_choice" | "multiple_choice" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("invalid_question_type");
            err.message =
                Some("Question type must be 'single_choice' or 'multiple_choice'.".into());
            Err(err)
        }
    }
}
