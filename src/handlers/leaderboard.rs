// src/handlers/leaderboard.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::leaderboard::{CompletedAttemptRow, LeaderboardEntry, LeaderboardParams},
    response::ApiResponse,
};

const DEFAULT_LIMIT: usize = 10;

fn completed_attempts_select(where_clause: &str) -> String {
    format!(
        r#"
        SELECT
            a.user_id, u.username, u.first_name, u.last_name,
            a.quiz_id, qz.title AS quiz_title,
            a.score_obtained, a.percentage_score
        FROM quiz_attempts a
        JOIN users u ON a.user_id = u.id
        JOIN quizzes qz ON a.quiz_id = qz.id
        WHERE a.status = 'completed' {}
        ORDER BY a.id
        "#,
        where_clause
    )
}

/// Global ranking: group completed attempts by user, total their scores and
/// average their percentages, sort by total descending. The sort is stable,
/// so users with equal totals keep first-encounter order. Ranks are the
/// 1-based positions after the sort.
fn rank_global(rows: Vec<CompletedAttemptRow>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut percentage_sums: Vec<f64> = Vec::new();

    for row in rows {
        match index.get(&row.user_id) {
            Some(&i) => {
                entries[i].total_score += row.score_obtained;
                entries[i].attempt_count += 1;
                percentage_sums[i] += row.percentage_score;
            }
            None => {
                index.insert(row.user_id, entries.len());
                percentage_sums.push(row.percentage_score);
                entries.push(LeaderboardEntry {
                    rank: 0,
                    user_id: row.user_id,
                    username: row.username,
                    first_name: row.first_name,
                    last_name: row.last_name,
                    total_score: row.score_obtained,
                    average_score: 0.0,
                    attempt_count: 1,
                    quiz_id: None,
                    quiz_title: None,
                });
            }
        }
    }

    for (entry, sum) in entries.iter_mut().zip(&percentage_sums) {
        entry.average_score = sum / entry.attempt_count as f64;
    }

    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as i64 + 1;
    }

    entries.truncate(limit);
    entries
}

/// Per-quiz ranking: one entry per user, credited with their highest score
/// on the quiz (the first such attempt encountered wins ties), sorted
/// descending with 1-based ranks.
fn rank_quiz(rows: Vec<CompletedAttemptRow>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.user_id) {
            Some(&i) => {
                if row.score_obtained > entries[i].total_score {
                    entries[i].total_score = row.score_obtained;
                    entries[i].average_score = row.percentage_score;
                }
            }
            None => {
                index.insert(row.user_id, entries.len());
                entries.push(LeaderboardEntry {
                    rank: 0,
                    user_id: row.user_id,
                    username: row.username,
                    first_name: row.first_name,
                    last_name: row.last_name,
                    total_score: row.score_obtained,
                    average_score: row.percentage_score,
                    attempt_count: 1,
                    quiz_id: Some(row.quiz_id),
                    quiz_title: Some(row.quiz_title),
                });
            }
        }
    }

    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as i64 + 1;
    }

    entries.truncate(limit);
    entries
}

/// Global leaderboard over all completed attempts.
pub async fn global_leaderboard(
    State(pool): State<SqlitePool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, CompletedAttemptRow>(&completed_attempts_select(""))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard rows: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT as i64).max(0) as usize;
    let leaderboard = rank_global(rows, limit);

    Ok(Json(ApiResponse::success(
        leaderboard,
        "Leaderboard retrieved successfully",
    )))
}

/// Best-score-per-user leaderboard for one quiz.
pub async fn quiz_leaderboard(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
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

    let rows = sqlx::query_as::<_, CompletedAttemptRow>(&completed_attempts_select(
        "AND a.quiz_id = ?",
    ))
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT as i64).max(0) as usize;
    let leaderboard = rank_quiz(rows, limit);

    Ok(Json(ApiResponse::success(
        leaderboard,
        "Quiz leaderboard retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: i64, score: i64, percentage: f64) -> CompletedAttemptRow {
        CompletedAttemptRow {
            user_id,
            username: format!("user{}", user_id),
            first_name: None,
            last_name: None,
            quiz_id: 1,
            quiz_title: "Quiz".to_string(),
            score_obtained: score,
            percentage_score: percentage,
        }
    }

    #[test]
    fn global_ranks_by_total_not_average() {
        // A: 80 + 90 = 170 total. B: a single 100 with the higher average.
        let rows = vec![row(1, 80, 80.0), row(2, 100, 100.0), row(1, 90, 90.0)];
        let board = rank_global(rows, 10);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, 1);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].total_score, 170);
        assert_eq!(board[0].attempt_count, 2);
        assert!((board[0].average_score - 85.0).abs() < 1e-9);
        assert_eq!(board[1].user_id, 2);
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].total_score, 100);
    }

    #[test]
    fn global_ties_keep_encounter_order() {
        let rows = vec![row(1, 50, 50.0), row(2, 50, 50.0)];
        let board = rank_global(rows, 10);

        assert_eq!(board[0].user_id, 1);
        assert_eq!(board[1].user_id, 2);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn global_truncates_to_limit() {
        let rows = vec![row(1, 30, 30.0), row(2, 20, 20.0), row(3, 10, 10.0)];
        let board = rank_global(rows, 2);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, 1);
        assert_eq!(board[1].user_id, 2);
    }

    #[test]
    fn quiz_keeps_best_attempt_per_user() {
        let rows = vec![row(1, 60, 60.0), row(1, 85, 85.0), row(2, 70, 70.0)];
        let board = rank_quiz(rows, 10);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, 1);
        assert_eq!(board[0].total_score, 85);
        assert_eq!(board[1].user_id, 2);
        assert_eq!(board[1].total_score, 70);
    }

    #[test]
    fn quiz_best_score_tie_keeps_first_attempt() {
        let mut first = row(1, 85, 85.0);
        first.percentage_score = 42.0;
        let rows = vec![first, row(1, 85, 85.0)];
        let board = rank_quiz(rows, 10);

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].total_score, 85);
        assert!((board[0].average_score - 42.0).abs() < 1e-9);
    }
}
