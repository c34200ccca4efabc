// src/handlers/quizzes.rs

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
    models::{
        question::{PublicQuestion, Question, QuestionOption},
        quiz::{CreateQuizRequest, Quiz, QuizDto},
    },
    response::ApiResponse,
    utils::jwt::Claims,
};

/// Quiz row enriched with creator username and question aggregates.
fn quiz_select(where_clause: &str) -> String {
    format!(
        r#"
        SELECT
            q.id, q.title, q.description, q.topic, q.difficulty,
            q.time_limit_minutes, q.passing_score, q.active, q.created_by,
            u.username AS created_by_username,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS total_questions,
            (SELECT COALESCE(SUM(points), 0) FROM questions WHERE quiz_id = q.id) AS total_points,
            q.created_at, q.updated_at
        FROM quizzes q
        JOIN users u ON q.created_by = u.id
        {}
        ORDER BY q.id DESC
        "#,
        where_clause
    )
}

/// Loads a quiz and checks the caller may modify it (creator or admin).
pub async fn authorize_quiz_owner(
    pool: &SqlitePool,
    quiz_id: i64,
    claims: &Claims,
) -> Result<Quiz, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(format!(
            "Quiz not found with id: {}",
            quiz_id
        )))?;

    if !claims.is_admin() && quiz.created_by != claims.user_id() {
        return Err(AppError::Forbidden(
            "You don't have permission to manage this quiz".to_string(),
        ));
    }

    Ok(quiz)
}

/// Loads a quiz's questions in display order, correctness withheld.
pub async fn load_public_questions(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<PublicQuestion>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = ? ORDER BY question_order, id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(questions.len());
    for question in questions {
        let options = sqlx::query_as::<_, QuestionOption>(
            "SELECT * FROM question_options WHERE question_id = ? ORDER BY option_order, id",
        )
        .bind(question.id)
        .fetch_all(pool)
        .await?;
        result.push(PublicQuestion::from_parts(question, options));
    }

    Ok(result)
}

/// Lists all quizzes.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizDto>(&quiz_select(""))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(ApiResponse::success(
        quizzes,
        "Quizzes retrieved successfully",
    )))
}

/// Retrieves one quiz with its questions.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut quiz = sqlx::query_as::<_, QuizDto>(&quiz_select("WHERE q.id = ?"))
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound(format!("Quiz not found with id: {}", id)))?;

    quiz.questions = Some(load_public_questions(&pool, id).await?);

    Ok(Json(ApiResponse::success(
        quiz,
        "Quiz retrieved successfully",
    )))
}

/// Lists quizzes for one topic.
pub async fn get_quizzes_by_topic(
    State(pool): State<SqlitePool>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizDto>(&quiz_select("WHERE q.topic = ?"))
        .bind(&topic)
        .fetch_all(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        quizzes,
        "Quizzes retrieved successfully",
    )))
}

/// Lists the distinct topics across all quizzes.
pub async fn get_topics(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let topics =
        sqlx::query_scalar::<_, String>("SELECT DISTINCT topic FROM quizzes ORDER BY topic")
            .fetch_all(&pool)
            .await?;

    Ok(Json(ApiResponse::success(
        topics,
        "Topics retrieved successfully",
    )))
}

/// Lists quizzes created by the caller.
pub async fn my_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizDto>(&quiz_select("WHERE q.created_by = ?"))
        .bind(claims.user_id())
        .fetch_all(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        quizzes,
        "Your quizzes retrieved successfully",
    )))
}

/// Creates a quiz, optionally with nested questions and options.
/// All rows are written in a single transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let quiz_id = sqlx::query(
        r#"
        INSERT INTO quizzes
        (title, description, topic, difficulty, time_limit_minutes, passing_score, active, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.topic)
    .bind(&payload.difficulty)
    .bind(payload.time_limit_minutes)
    .bind(payload.passing_score)
    .bind(payload.active.unwrap_or(true))
    .bind(claims.user_id())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    if let Some(questions) = &payload.questions {
        for (qi, question) in questions.iter().enumerate() {
            let question_id = sqlx::query(
                r#"
                INSERT INTO questions
                (quiz_id, question_text, question_type, points, question_order, explanation)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(quiz_id)
            .bind(&question.question_text)
            .bind(&question.question_type)
            .bind(question.points)
            .bind(question.question_order.unwrap_or(qi as i64 + 1))
            .bind(&question.explanation)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for (oi, option) in question.options.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO question_options (question_id, option_text, is_correct, option_order)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(question_id)
                .bind(&option.option_text)
                .bind(option.is_correct)
                .bind(option.option_order.unwrap_or(oi as i64 + 1))
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;

    let quiz = sqlx::query_as::<_, QuizDto>(&quiz_select("WHERE q.id = ?"))
        .bind(quiz_id)
        .fetch_one(&pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(quiz, "Quiz created successfully")),
    ))
}

/// Updates a quiz. Creator or admin only.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    authorize_quiz_owner(&pool, id, &claims).await?;

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?, description = ?, topic = ?, difficulty = ?,
            time_limit_minutes = ?, passing_score = ?, active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.topic)
    .bind(&payload.difficulty)
    .bind(payload.time_limit_minutes)
    .bind(payload.passing_score)
    .bind(payload.active.unwrap_or(true))
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&pool)
    .await?;

    let quiz = sqlx::query_as::<_, QuizDto>(&quiz_select("WHERE q.id = ?"))
        .bind(id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        quiz,
        "Quiz updated successfully",
    )))
}

/// Deletes a quiz. Creator or admin only.
/// Questions, options, attempts and answers go with it via cascading
/// foreign keys.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize_quiz_owner(&pool, id, &claims).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(ApiResponse::success(
        serde_json::json!(null),
        "Quiz deleted successfully",
    )))
}
