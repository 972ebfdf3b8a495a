//! Repository registry backed by the local cache.
//!
//! Resolves upstream repositories to stable local row ids so cached pull
//! requests can reference them across syncs.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::GitHubRepository;
use crate::services::github_client::ApiRepository;
use async_trait::async_trait;

/// Registry surface the sync engine consumes.
#[async_trait]
pub trait RepositoryRegistry: Send + Sync {
    /// Find or create the local record for an upstream repository.
    ///
    /// Idempotent on (endpoint, owner, name); the returned record always
    /// carries its local id.
    async fn upsert_github_repository(
        &self,
        endpoint: &str,
        repository: &ApiRepository,
    ) -> Result<GitHubRepository, AppError>;

    /// Look up a repository record by its local id.
    async fn find_github_repository_by_id(
        &self,
        id: i64,
    ) -> Result<Option<GitHubRepository>, AppError>;
}

/// Registry implementation over the SQLite cache.
pub struct DbRepositoryRegistry {
    pool: DbPool,
}

impl DbRepositoryRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepositoryRegistry for DbRepositoryRegistry {
    async fn upsert_github_repository(
        &self,
        endpoint: &str,
        repository: &ApiRepository,
    ) -> Result<GitHubRepository, AppError> {
        sqlx::query(
            r#"
            INSERT INTO github_repositories (endpoint, owner, name, clone_url, html_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(endpoint, owner, name) DO UPDATE SET
                clone_url = excluded.clone_url,
                html_url = excluded.html_url
            "#,
        )
        .bind(endpoint)
        .bind(&repository.owner.login)
        .bind(&repository.name)
        .bind(&repository.clone_url)
        .bind(&repository.html_url)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                format!("Failed to upsert repository: {}", e),
                "upsert_github_repository",
            )
        })?;

        let record = sqlx::query_as::<_, GitHubRepository>(
            "SELECT id, endpoint, owner, name, clone_url, html_url
             FROM github_repositories
             WHERE endpoint = ? AND owner = ? AND name = ?",
        )
        .bind(endpoint)
        .bind(&repository.owner.login)
        .bind(&repository.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                format!("Failed to load upserted repository: {}", e),
                "upsert_github_repository",
            )
        })?;

        Ok(record)
    }

    async fn find_github_repository_by_id(
        &self,
        id: i64,
    ) -> Result<Option<GitHubRepository>, AppError> {
        let record = sqlx::query_as::<_, GitHubRepository>(
            "SELECT id, endpoint, owner, name, clone_url, html_url
             FROM github_repositories
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                format!("Failed to load repository: {}", e),
                "find_github_repository_by_id",
            )
        })?;

        Ok(record)
    }
}
