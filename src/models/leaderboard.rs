// src/models/leaderboard.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One completed attempt joined with its user and quiz, the raw material
/// both leaderboard views aggregate over.
#[derive(Debug, Clone, FromRow)]
pub struct CompletedAttemptRow {
    pub user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score_obtained: i64,
    pub percentage_score: f64,
}

/// One ranked leaderboard row.
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_score: i64,
    pub average_score: f64,
    pub attempt_count: i64,
    pub quiz_id: Option<i64>,
    pub quiz_title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}
