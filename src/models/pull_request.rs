//! Pull request models and cache access.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::repository::GitHubRepository;
use crate::models::status::PullRequestStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One side of a pull request: a branch tip in some repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    /// Branch name, e.g. `feature/sync`.
    pub ref_name: String,

    /// Commit SHA at the tip of the branch.
    pub sha: String,

    /// Repository the branch lives in. `None` when the source repository
    /// has been deleted, which GitHub reports for some fork pull requests.
    pub github_repository: Option<GitHubRepository>,
}

/// A cached pull request, hydrated with repository and status data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Local cache row id.
    pub id: i64,

    /// Pull request number as shown on GitHub.
    pub number: i64,

    /// Pull request title.
    pub title: String,

    /// Creation time as a unix timestamp.
    pub created_at: i64,

    /// Login of the user who opened the pull request.
    pub author: String,

    /// Branch the pull request wants to merge.
    pub head: PullRequestRef,

    /// Branch the pull request merges into.
    pub base: PullRequestRef,

    /// Latest cached commit status for the head, if any.
    pub status: Option<PullRequestStatus>,
}

/// Raw row shape of the pull_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRecord {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub created_at: i64,
    pub author: String,
    pub head_ref: String,
    pub head_sha: String,
    pub head_repo_id: Option<i64>,
    pub base_ref: String,
    pub base_sha: String,
    pub base_repo_id: i64,
}

/// A freshly fetched pull request, not yet written to the cache.
#[derive(Debug, Clone)]
pub struct NewPullRequestRecord {
    pub number: i64,
    pub title: String,
    pub created_at: i64,
    pub author: String,
    pub head_ref: String,
    pub head_sha: String,
    pub head_repo_id: Option<i64>,
    pub base_ref: String,
    pub base_sha: String,
    pub base_repo_id: i64,
}

/// Replace the entire cached pull request table with a fresh snapshot.
///
/// Runs in a single transaction so readers never observe a half-written
/// cache. Statuses whose pull request row disappeared in the replace are
/// swept in the same transaction.
pub async fn replace_all(pool: &DbPool, records: &[NewPullRequestRecord]) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(|e| {
        AppError::database_with_op(format!("Failed to begin transaction: {}", e), "replace_all")
    })?;

    sqlx::query("DELETE FROM pull_requests")
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                format!("Failed to clear pull requests: {}", e),
                "replace_all",
            )
        })?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                number, title, created_at, author,
                head_ref, head_sha, head_repo_id,
                base_ref, base_sha, base_repo_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.number)
        .bind(&record.title)
        .bind(record.created_at)
        .bind(&record.author)
        .bind(&record.head_ref)
        .bind(&record.head_sha)
        .bind(record.head_repo_id)
        .bind(&record.base_ref)
        .bind(&record.base_sha)
        .bind(record.base_repo_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                format!("Failed to insert pull request #{}: {}", record.number, e),
                "replace_all",
            )
        })?;
    }

    // Row ids were regenerated above, so any status row keyed to an old id
    // is unreachable from now on.
    sqlx::query(
        "DELETE FROM pull_request_statuses
         WHERE pull_request_id NOT IN (SELECT id FROM pull_requests)",
    )
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::database_with_op(
            format!("Failed to sweep orphaned statuses: {}", e),
            "replace_all",
        )
    })?;

    tx.commit().await.map_err(|e| {
        AppError::database_with_op(format!("Failed to commit transaction: {}", e), "replace_all")
    })?;

    Ok(())
}

/// List cached pull requests for one base repository, highest number first.
pub async fn list_for_repository(
    pool: &DbPool,
    base_repo_id: i64,
) -> Result<Vec<PullRequestRecord>, AppError> {
    let records = sqlx::query_as::<_, PullRequestRecord>(
        "SELECT id, number, title, created_at, author,
                head_ref, head_sha, head_repo_id,
                base_ref, base_sha, base_repo_id
         FROM pull_requests
         WHERE base_repo_id = ?
         ORDER BY number DESC",
    )
    .bind(base_repo_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        AppError::database_with_op(
            format!("Failed to list pull requests: {}", e),
            "list_for_repository",
        )
    })?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::{upsert_statuses, NewPullRequestStatus};
    use tempfile::tempdir;

    async fn setup_test_db() -> (DbPool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"))
            .await
            .unwrap();
        (pool, dir)
    }

    fn record(number: i64, base_repo_id: i64) -> NewPullRequestRecord {
        NewPullRequestRecord {
            number,
            title: format!("PR #{}", number),
            created_at: 1_700_000_000 + number,
            author: "octocat".to_string(),
            head_ref: "feature".to_string(),
            head_sha: format!("sha-{}", number),
            head_repo_id: Some(base_repo_id),
            base_ref: "main".to_string(),
            base_sha: "base-sha".to_string(),
            base_repo_id,
        }
    }

    #[tokio::test]
    async fn test_replace_all_overwrites_previous_snapshot() {
        let (pool, _dir) = setup_test_db().await;

        replace_all(&pool, &[record(1, 1), record(2, 1)]).await.unwrap();
        replace_all(&pool, &[record(3, 1)]).await.unwrap();

        let records = list_for_repository(&pool, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 3);
    }

    #[tokio::test]
    async fn test_replace_all_with_empty_snapshot_clears_cache() {
        let (pool, _dir) = setup_test_db().await;

        replace_all(&pool, &[record(1, 1)]).await.unwrap();
        replace_all(&pool, &[]).await.unwrap();

        let records = list_for_repository(&pool, 1).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_number_descending() {
        let (pool, _dir) = setup_test_db().await;

        replace_all(&pool, &[record(3, 1), record(10, 1), record(1, 1)])
            .await
            .unwrap();

        let records = list_for_repository(&pool, 1).await.unwrap();
        let numbers: Vec<i64> = records.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![10, 3, 1]);
    }

    #[tokio::test]
    async fn test_list_filters_by_base_repository() {
        let (pool, _dir) = setup_test_db().await;

        replace_all(&pool, &[record(1, 1), record(2, 2)]).await.unwrap();

        let records = list_for_repository(&pool, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 1);
    }

    #[tokio::test]
    async fn test_replace_all_sweeps_orphaned_statuses() {
        let (pool, _dir) = setup_test_db().await;

        replace_all(&pool, &[record(1, 1)]).await.unwrap();
        let rows = list_for_repository(&pool, 1).await.unwrap();

        upsert_statuses(
            &pool,
            &[NewPullRequestStatus {
                head_sha: rows[0].head_sha.clone(),
                pull_request_id: rows[0].id,
                state: "success".to_string(),
                total_count: 1,
                checks: vec![],
            }],
        )
        .await
        .unwrap();

        // The replace regenerates row ids, so the old status row is orphaned.
        replace_all(&pool, &[record(2, 1)]).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_request_statuses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
