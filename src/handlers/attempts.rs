// src/handlers/attempts.rs

use std::collections::{BTreeSet, HashMap};

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        attempt::{
            AnswerDto, AttemptDto, CompleteAttemptRequest, QuizAttempt, StartAttemptRequest,
            SubmitAnswerRequest,
        },
        question::{Question, QuestionOption},
        quiz::Quiz,
    },
    response::ApiResponse,
    utils::jwt::Claims,
};

use super::quizzes::load_public_questions;

/// Attempt row joined with user, quiz and question-count context.
fn attempt_select(where_clause: &str) -> String {
    format!(
        r#"
        SELECT
            a.id, a.user_id, u.username, a.quiz_id, qz.title AS quiz_title,
            qz.time_limit_minutes, a.start_time, a.end_time, a.score_obtained,
            a.total_score, a.percentage_score, a.is_passed, a.status,
            a.time_taken_minutes,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = a.quiz_id) AS total_questions
        FROM quiz_attempts a
        JOIN users u ON a.user_id = u.id
        JOIN quizzes qz ON a.quiz_id = qz.id
        {}
        "#,
        where_clause
    )
}

/// Exact set-equality grading: a selection earns the question's points iff
/// it matches the correct-option set exactly, not a subset or superset.
fn grade_selection(selected: &BTreeSet<i64>, correct: &BTreeSet<i64>, points: i64) -> (bool, i64) {
    let is_correct = selected == correct;
    (is_correct, if is_correct { points } else { 0 })
}

/// Final percentage and pass verdict for a completed attempt.
///
/// A zero total short-circuits to 0.0 / failed. Otherwise the verdict is
/// only set when the quiz configures a passing score.
fn finalize_score(score_obtained: i64, total_score: i64, passing_score: Option<i64>) -> (f64, Option<bool>) {
    if total_score <= 0 {
        return (0.0, Some(false));
    }
    let percentage = score_obtained as f64 / total_score as f64 * 100.0;
    let is_passed = passing_score.map(|threshold| percentage >= threshold as f64);
    (percentage, is_passed)
}

async fn load_attempt(pool: &SqlitePool, id: i64) -> Result<QuizAttempt, AppError> {
    sqlx::query_as::<_, QuizAttempt>("SELECT * FROM quiz_attempts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))
}

async fn load_attempt_dto(pool: &SqlitePool, id: i64) -> Result<AttemptDto, AppError> {
    sqlx::query_as::<_, AttemptDto>(&attempt_select("WHERE a.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))
}

async fn load_answers(pool: &SqlitePool, attempt_id: i64) -> Result<Vec<AnswerDto>, AppError> {
    Ok(sqlx::query_as::<_, AnswerDto>(
        r#"
        SELECT
            ua.id, ua.question_id, q.question_text, ua.selected_option_ids,
            ua.is_correct, ua.points_earned, q.explanation
        FROM user_answers ua
        JOIN questions q ON ua.question_id = q.id
        WHERE ua.attempt_id = ?
        ORDER BY ua.id
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?)
}

/// Starts a new attempt on a quiz.
///
/// The attempt's total score is a snapshot of the quiz's question points at
/// this instant; later quiz edits never change it. Returns the attempt with
/// the question list, correctness flags withheld.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
        .bind(payload.quiz_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound(format!(
            "Quiz not found with id: {}",
            payload.quiz_id
        )))?;

    let mut tx = pool.begin().await?;

    let total_score = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(points), 0) FROM questions WHERE quiz_id = ?",
    )
    .bind(quiz.id)
    .fetch_one(&mut *tx)
    .await?;

    let attempt_id = sqlx::query(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_id, start_time, total_score, status)
        VALUES (?, ?, ?, ?, 'in_progress')
        "#,
    )
    .bind(claims.user_id())
    .bind(quiz.id)
    .bind(chrono::Utc::now())
    .bind(total_score)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    tx.commit().await?;

    let mut attempt = load_attempt_dto(&pool, attempt_id).await?;
    attempt.questions = Some(load_public_questions(&pool, quiz.id).await?);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(attempt, "Quiz started successfully")),
    ))
}

/// Records an answer for one question of a running attempt.
///
/// Resubmission overwrites the prior selection; the UNIQUE(attempt_id,
/// question_id) index plus the conflict clause keeps one row per question
/// even under concurrent submits.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_attempt(&pool, payload.attempt_id).await?;

    if attempt.user_id != claims.user_id() {
        return Err(AppError::BadRequest(
            "This attempt does not belong to you".to_string(),
        ));
    }

    if attempt.status != "in_progress" {
        return Err(AppError::BadRequest(
            "This quiz attempt is not in progress".to_string(),
        ));
    }

    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(payload.question_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if question.quiz_id != attempt.quiz_id {
        return Err(AppError::BadRequest(
            "This question does not belong to the quiz".to_string(),
        ));
    }

    let options = sqlx::query_as::<_, QuestionOption>(
        "SELECT * FROM question_options WHERE question_id = ?",
    )
    .bind(question.id)
    .fetch_all(&pool)
    .await?;

    let known_ids: BTreeSet<i64> = options.iter().map(|o| o.id).collect();
    let selected: BTreeSet<i64> = payload.selected_option_ids.iter().copied().collect();

    for option_id in &selected {
        if !known_ids.contains(option_id) {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM question_options WHERE id = ?",
            )
            .bind(option_id)
            .fetch_one(&pool)
            .await?;

            if exists == 0 {
                return Err(AppError::NotFound(format!(
                    "Option not found with id: {}",
                    option_id
                )));
            }
            return Err(AppError::BadRequest(
                "Option does not belong to this question".to_string(),
            ));
        }
    }

    let correct: BTreeSet<i64> = options.iter().filter(|o| o.is_correct).map(|o| o.id).collect();
    let (is_correct, points_earned) = grade_selection(&selected, &correct, question.points);

    let selected_vec: Vec<i64> = selected.into_iter().collect();

    sqlx::query(
        r#"
        INSERT INTO user_answers (attempt_id, question_id, selected_option_ids, is_correct, points_earned)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(attempt_id, question_id) DO UPDATE SET
            selected_option_ids = excluded.selected_option_ids,
            is_correct = excluded.is_correct,
            points_earned = excluded.points_earned
        "#,
    )
    .bind(attempt.id)
    .bind(question.id)
    .bind(SqlJson(selected_vec))
    .bind(is_correct)
    .bind(points_earned)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let answer = sqlx::query_as::<_, AnswerDto>(
        r#"
        SELECT
            ua.id, ua.question_id, q.question_text, ua.selected_option_ids,
            ua.is_correct, ua.points_earned, q.explanation
        FROM user_answers ua
        JOIN questions q ON ua.question_id = q.id
        WHERE ua.attempt_id = ? AND ua.question_id = ?
        "#,
    )
    .bind(attempt.id)
    .bind(question.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        answer,
        "Answer submitted successfully",
    )))
}

/// Completes a running attempt and settles its score.
///
/// Unanswered questions contribute zero; there is no completeness check.
/// The in_progress -> completed transition happens exactly once.
pub async fn complete_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CompleteAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let attempt = sqlx::query_as::<_, QuizAttempt>("SELECT * FROM quiz_attempts WHERE id = ?")
        .bind(payload.attempt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

    if attempt.user_id != claims.user_id() {
        return Err(AppError::BadRequest(
            "This attempt does not belong to you".to_string(),
        ));
    }

    if attempt.status != "in_progress" {
        return Err(AppError::BadRequest(
            "This quiz attempt is already completed or abandoned".to_string(),
        ));
    }

    let passing_score = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT passing_score FROM quizzes WHERE id = ?",
    )
    .bind(attempt.quiz_id)
    .fetch_one(&mut *tx)
    .await?;

    let score_obtained = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(points_earned), 0) FROM user_answers WHERE attempt_id = ?",
    )
    .bind(attempt.id)
    .fetch_one(&mut *tx)
    .await?;

    let end_time = chrono::Utc::now();
    let (percentage_score, is_passed) =
        finalize_score(score_obtained, attempt.total_score, passing_score);
    let time_taken_minutes = (end_time - attempt.start_time).num_minutes();

    sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET end_time = ?, score_obtained = ?, percentage_score = ?,
            is_passed = ?, status = 'completed', time_taken_minutes = ?
        WHERE id = ?
        "#,
    )
    .bind(end_time)
    .bind(score_obtained)
    .bind(percentage_score)
    .bind(is_passed)
    .bind(time_taken_minutes)
    .bind(attempt.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to complete attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tx.commit().await?;

    let mut dto = load_attempt_dto(&pool, attempt.id).await?;
    dto.answers = Some(load_answers(&pool, attempt.id).await?);

    Ok(Json(ApiResponse::success(
        dto,
        "Quiz completed successfully",
    )))
}

/// Retrieves one attempt with its answers. Owner or admin only.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut dto = load_attempt_dto(&pool, id).await?;

    if dto.user_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You don't have permission to view this attempt".to_string(),
        ));
    }

    dto.answers = Some(load_answers(&pool, id).await?);

    Ok(Json(ApiResponse::success(
        dto,
        "Attempt retrieved successfully",
    )))
}

/// Lists the caller's completed attempts, newest end first, each annotated
/// with its per-quiz ordinal.
pub async fn my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut attempts = sqlx::query_as::<_, AttemptDto>(&attempt_select(
        "WHERE a.user_id = ? AND a.status = 'completed' ORDER BY a.end_time DESC",
    ))
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    // Ordinal within each quiz, in the order the attempts were taken.
    let mut by_id: Vec<(i64, i64)> = attempts.iter().map(|a| (a.id, a.quiz_id)).collect();
    by_id.sort_by_key(|(id, _)| *id);
    let mut counters: HashMap<i64, i64> = HashMap::new();
    let mut ordinals: HashMap<i64, i64> = HashMap::new();
    for (id, quiz_id) in by_id {
        let counter = counters.entry(quiz_id).or_insert(0);
        *counter += 1;
        ordinals.insert(id, *counter);
    }
    for attempt in &mut attempts {
        attempt.attempt_number = ordinals.get(&attempt.id).copied();
    }

    Ok(Json(ApiResponse::success(
        attempts,
        "Your attempts retrieved successfully",
    )))
}

/// Lists the caller's attempts on one quiz, any status.
pub async fn attempts_by_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, AttemptDto>(&attempt_select(
        "WHERE a.user_id = ? AND a.quiz_id = ? ORDER BY a.start_time DESC",
    ))
    .bind(claims.user_id())
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        attempts,
        "Quiz attempts retrieved successfully",
    )))
}
