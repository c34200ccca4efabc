// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, Question, QuestionDto, QuestionOption},
    response::ApiResponse,
    utils::jwt::Claims,
};

use super::quizzes::{authorize_quiz_owner, load_public_questions};

async fn load_question(pool: &SqlitePool, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(format!(
            "Question not found with id: {}",
            id
        )))
}

async fn load_options(pool: &SqlitePool, question_id: i64) -> Result<Vec<QuestionOption>, AppError> {
    Ok(sqlx::query_as::<_, QuestionOption>(
        "SELECT * FROM question_options WHERE question_id = ? ORDER BY option_order, id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?)
}

/// Adds a question with its options to a quiz.
/// Creator or admin only; at least one option must be marked correct.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    authorize_quiz_owner(&pool, payload.quiz_id, &claims).await?;

    if !payload.options.iter().any(|o| o.is_correct) {
        return Err(AppError::BadRequest(
            "At least one option must be marked as correct".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let question_id = sqlx::query(
        r#"
        INSERT INTO questions
        (quiz_id, question_text, question_type, points, question_order, explanation)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.quiz_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(payload.points)
    .bind(payload.question_order.unwrap_or(1))
    .bind(&payload.explanation)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    for (i, option) in payload.options.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO question_options (question_id, option_text, is_correct, option_order)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(question_id)
        .bind(&option.option_text)
        .bind(option.is_correct)
        .bind(option.option_order.unwrap_or(i as i64 + 1))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let question = load_question(&pool, question_id).await?;
    let options = load_options(&pool, question_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            QuestionDto::from_parts(question, options),
            "Question created successfully",
        )),
    ))
}

/// Deletes a question. Creator or admin only; options go with it.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = load_question(&pool, id).await?;

    authorize_quiz_owner(&pool, question.quiz_id, &claims).await?;

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(ApiResponse::success(
        serde_json::json!(null),
        "Question deleted successfully",
    )))
}

/// Retrieves one question with correctness flags.
/// Restricted to the quiz creator or an admin so answers stay hidden from
/// takers.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = load_question(&pool, id).await?;

    authorize_quiz_owner(&pool, question.quiz_id, &claims).await?;

    let options = load_options(&pool, id).await?;

    Ok(Json(ApiResponse::success(
        QuestionDto::from_parts(question, options),
        "Question retrieved successfully",
    )))
}

/// Lists a quiz's questions for takers, correctness flags withheld.
pub async fn get_questions_by_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_one(&pool)
        .await?;

    if quiz_exists == 0 {
        return Err(AppError::NotFound(format!(
            "Quiz not found with id: {}",
            quiz_id
        )));
    }

    let questions = load_public_questions(&pool, quiz_id).await?;

    Ok(Json(ApiResponse::success(
        questions,
        "Questions retrieved successfully",
    )))
}
