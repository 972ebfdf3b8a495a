//! Commit status models and cache access.

use crate::db::DbPool;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate CI state of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
    Error,
    Pending,
}

impl From<&str> for StatusState {
    fn from(s: &str) -> Self {
        match s {
            "success" => StatusState::Success,
            "failure" => StatusState::Failure,
            "error" => StatusState::Error,
            _ => StatusState::Pending,
        }
    }
}

/// A single CI check inside a combined status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheck {
    /// Check id as reported by the API.
    pub id: i64,

    /// Check state, e.g. `success` or `pending`.
    pub state: String,

    /// Check context, e.g. `ci/circleci: build`.
    pub context: String,
}

/// Cached combined status for one pull request head commit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestStatus {
    /// Local cache row id.
    pub id: i64,

    /// Commit SHA the status was reported for.
    pub head_sha: String,

    /// Cache row id of the pull request this status belongs to.
    pub pull_request_id: i64,

    /// Aggregate state, e.g. `success`.
    pub state: String,

    /// Total number of checks reported for the commit.
    pub total_count: i64,

    /// Individual checks as a JSON array.
    pub checks: String,
}

impl PullRequestStatus {
    /// Aggregate state as an enum.
    pub fn state_enum(&self) -> StatusState {
        StatusState::from(self.state.as_str())
    }

    /// Parse the stored checks JSON.
    pub fn checks_vec(&self) -> Vec<StatusCheck> {
        serde_json::from_str(&self.checks).unwrap_or_default()
    }
}

/// A freshly fetched status, not yet written to the cache.
#[derive(Debug, Clone)]
pub struct NewPullRequestStatus {
    pub head_sha: String,
    pub pull_request_id: i64,
    pub state: String,
    pub total_count: i64,
    pub checks: Vec<StatusCheck>,
}

/// Upsert a batch of statuses in a single transaction.
///
/// Rows are keyed by `(head_sha, pull_request_id)`; refreshing a status
/// updates the existing row in place.
pub async fn upsert_statuses(
    pool: &DbPool,
    statuses: &[NewPullRequestStatus],
) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(|e| {
        AppError::database_with_op(format!("Failed to begin transaction: {}", e), "upsert_statuses")
    })?;

    for status in statuses {
        let checks_json = serde_json::to_string(&status.checks)?;

        sqlx::query(
            r#"
            INSERT INTO pull_request_statuses (head_sha, pull_request_id, state, total_count, checks)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(head_sha, pull_request_id) DO UPDATE SET
                state = excluded.state,
                total_count = excluded.total_count,
                checks = excluded.checks
            "#,
        )
        .bind(&status.head_sha)
        .bind(status.pull_request_id)
        .bind(&status.state)
        .bind(status.total_count)
        .bind(&checks_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::database_with_op(format!("Failed to upsert status: {}", e), "upsert_statuses")
        })?;
    }

    tx.commit().await.map_err(|e| {
        AppError::database_with_op(
            format!("Failed to commit transaction: {}", e),
            "upsert_statuses",
        )
    })?;

    Ok(())
}

/// Look up the cached status for one pull request head commit.
pub async fn find_status(
    pool: &DbPool,
    head_sha: &str,
    pull_request_id: i64,
) -> Result<Option<PullRequestStatus>, AppError> {
    let status = sqlx::query_as::<_, PullRequestStatus>(
        "SELECT id, head_sha, pull_request_id, state, total_count, checks
         FROM pull_request_statuses
         WHERE head_sha = ? AND pull_request_id = ?",
    )
    .bind(head_sha)
    .bind(pull_request_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        AppError::database_with_op(format!("Failed to load status: {}", e), "find_status")
    })?;

    Ok(status)
}
