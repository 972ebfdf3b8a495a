//! Pull request synchronization engine.
//!
//! This module provides the core sync functionality:
//! - Full refresh cycle: fetch open pull requests, resolve referenced
//!   repositories, replace the cached list, reload, refresh CI status,
//!   prune stale fork remotes
//! - Hydrated reads of the cached list without network access
//! - Per-repository in-flight fetch bookkeeping for busy-state display
//!
//! Errors inside a refresh cycle are contained: logged, emitted on the
//! error channel, and never propagated past the operation boundary. The
//! in-flight counter is balanced on every path.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::pull_request::{
    self, NewPullRequestRecord, PullRequest, PullRequestRecord, PullRequestRef,
};
use crate::models::status::{self, NewPullRequestStatus, StatusCheck};
use crate::models::{forked_remotes_to_delete, Account, GitHubRepository, Repository};
use crate::services::fetch_coordinator::FetchCoordinator;
use crate::services::git_remotes::{CommandGitRemotes, GitRemotes};
use crate::services::github_client::{
    ApiPullRequest, GitHubApi, GitHubClient, GitHubClientConfig,
};
use crate::services::repository_registry::{DbRepositoryRegistry, RepositoryRegistry};
use crate::services::store_events::{StoreEvents, Subscription};
use futures::future::try_join_all;
use std::sync::Arc;

/// Synchronizes the local pull request cache with upstream.
///
/// Collaborators are injected at construction so tests can substitute
/// in-memory implementations.
pub struct SyncEngine {
    /// Database connection pool.
    pool: DbPool,

    /// Upstream API access.
    api: Arc<dyn GitHubApi>,

    /// Find-or-create resolution of upstream repositories.
    registry: Arc<dyn RepositoryRegistry>,

    /// Remote listing and removal in local checkouts.
    git: Arc<dyn GitRemotes>,

    /// Update and error notification hub.
    events: StoreEvents,

    /// Per-repository active fetch counts.
    coordinator: FetchCoordinator,
}

impl SyncEngine {
    /// Create a sync engine with explicit collaborators.
    pub fn new(
        pool: DbPool,
        api: Arc<dyn GitHubApi>,
        registry: Arc<dyn RepositoryRegistry>,
        git: Arc<dyn GitRemotes>,
    ) -> Self {
        let events = StoreEvents::new();
        let coordinator = FetchCoordinator::new(events.clone());

        Self {
            pool,
            api,
            registry,
            git,
            events,
            coordinator,
        }
    }

    /// Create a sync engine with the production collaborators: the reqwest
    /// API client, the SQLite-backed registry, and the git CLI.
    pub fn with_defaults(pool: DbPool) -> Result<Self, AppError> {
        let api = Arc::new(GitHubClient::new(GitHubClientConfig::default())?);
        let registry = Arc::new(DbRepositoryRegistry::new(pool.clone()));
        Ok(Self::new(pool, api, registry, Arc::new(CommandGitRemotes::new())))
    }

    /// Register a callback for update notifications (cache content or
    /// busy-state changed for a repository).
    pub fn on_pull_requests_updated<F>(&self, callback: F) -> Subscription
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.events.on_pull_requests_updated(callback)
    }

    /// Register a callback for errors contained during sync.
    pub fn on_sync_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AppError) + Send + Sync + 'static,
    {
        self.events.on_sync_error(callback)
    }

    /// Whether a fetch is currently running for the repository.
    ///
    /// Repositories without an upstream association are never fetching.
    pub fn is_fetching_pull_requests(&self, repository: &Repository) -> bool {
        repository
            .github_repository
            .as_ref()
            .and_then(|gh| gh.db_id)
            .map(|id| self.coordinator.is_fetching(id))
            .unwrap_or(false)
    }

    /// Run a full refresh cycle for a repository.
    ///
    /// Returns an error only when the repository precondition is violated
    /// (no upstream association, or no assigned local id). Every failure
    /// inside the cycle is logged, emitted on the error channel, and
    /// contained; the cache keeps whatever was durably written before the
    /// failure.
    pub async fn fetch_pull_requests(
        &self,
        repository: &Repository,
        account: &Account,
    ) -> Result<(), AppError> {
        let (github_repository, repo_db_id) = Self::github_repo_db_id(repository)?;

        self.coordinator
            .change_active_fetch_count(repo_db_id, |count| count + 1);

        let result = self
            .run_fetch_cycle(repository, github_repository, account)
            .await;

        if let Err(error) = result {
            log::warn!(
                "Pull request sync for {} failed: {}",
                github_repository.full_name(),
                error
            );
            self.events.emit_sync_error(&error);
        }

        self.coordinator
            .change_active_fetch_count(repo_db_id, |count| count - 1);

        Ok(())
    }

    /// The contained portion of a refresh cycle (everything after the
    /// counter increment). A failure at any step skips the remaining steps.
    async fn run_fetch_cycle(
        &self,
        repository: &Repository,
        github_repository: &GitHubRepository,
        account: &Account,
    ) -> Result<(), AppError> {
        let api_results = self
            .api
            .fetch_open_pull_requests(
                account,
                &github_repository.owner,
                &github_repository.name,
            )
            .await?;
        log::debug!(
            "Fetched {} open pull request(s) for {}",
            api_results.len(),
            github_repository.full_name()
        );

        self.cache_pull_requests(github_repository, &api_results)
            .await?;

        let pull_requests = self.load_pull_requests_from_cache(repository).await?;
        self.refresh_status_for_pull_requests(&pull_requests, repository, account)
            .await?;
        self.prune_forked_remotes(repository, &pull_requests).await?;

        Ok(())
    }

    /// Resolve referenced repositories and replace the cached list.
    ///
    /// The head repository may be absent (deleted fork); the base
    /// repository must exist on every pull request.
    async fn cache_pull_requests(
        &self,
        github_repository: &GitHubRepository,
        api_results: &[ApiPullRequest],
    ) -> Result<(), AppError> {
        let endpoint = &github_repository.endpoint;
        let mut records = Vec::with_capacity(api_results.len());

        for api_pr in api_results {
            let head_repo_id = match &api_pr.head.repo {
                Some(repo) => {
                    self.registry
                        .upsert_github_repository(endpoint, repo)
                        .await?
                        .db_id
                }
                None => None,
            };

            let base_repo = api_pr.base.repo.as_ref().ok_or_else(|| {
                AppError::fault(format!(
                    "Pull request #{} is missing its base repository",
                    api_pr.number
                ))
            })?;
            let base = self
                .registry
                .upsert_github_repository(endpoint, base_repo)
                .await?;
            let base_repo_id = base.db_id.ok_or_else(|| {
                AppError::fault(format!(
                    "Stored base repository for pull request #{} has no local id",
                    api_pr.number
                ))
            })?;

            records.push(NewPullRequestRecord {
                number: api_pr.number,
                title: api_pr.title.clone(),
                created_at: parse_iso_timestamp(&api_pr.created_at),
                author: api_pr.user.login.clone(),
                head_ref: api_pr.head.ref_name.clone(),
                head_sha: api_pr.head.sha.clone(),
                head_repo_id,
                base_ref: api_pr.base.ref_name.clone(),
                base_sha: api_pr.base.sha.clone(),
                base_repo_id,
            });
        }

        pull_request::replace_all(&self.pool, &records).await
    }

    /// Read the cached pull request list for a repository, hydrated with
    /// repository records and statuses, highest number first.
    ///
    /// Never touches the network, so it is safe as a read-only query.
    pub async fn load_pull_requests_from_cache(
        &self,
        repository: &Repository,
    ) -> Result<Vec<PullRequest>, AppError> {
        let (_, repo_db_id) = Self::github_repo_db_id(repository)?;
        let records = pull_request::list_for_repository(&self.pool, repo_db_id).await?;

        let mut pull_requests = Vec::with_capacity(records.len());
        for record in records {
            pull_requests.push(self.hydrate_pull_request(record).await?);
        }

        Ok(pull_requests)
    }

    /// Build the full entity for one cached row.
    ///
    /// A missing status row hydrates as `None`; a missing base repository
    /// record is a fault (the cache references a row that must exist).
    async fn hydrate_pull_request(
        &self,
        record: PullRequestRecord,
    ) -> Result<PullRequest, AppError> {
        let head_repository = match record.head_repo_id {
            Some(id) => self.registry.find_github_repository_by_id(id).await?,
            None => None,
        };

        let base_repository = self
            .registry
            .find_github_repository_by_id(record.base_repo_id)
            .await?
            .ok_or_else(|| {
                AppError::fault(format!(
                    "Base repository {} for pull request #{} is missing from the cache",
                    record.base_repo_id, record.number
                ))
            })?;

        let pr_status = status::find_status(&self.pool, &record.head_sha, record.id).await?;

        Ok(PullRequest {
            id: record.id,
            number: record.number,
            title: record.title,
            created_at: record.created_at,
            author: record.author,
            head: PullRequestRef {
                ref_name: record.head_ref,
                sha: record.head_sha,
                github_repository: head_repository,
            },
            base: PullRequestRef {
                ref_name: record.base_ref,
                sha: record.base_sha,
                github_repository: Some(base_repository),
            },
            status: pr_status,
        })
    }

    /// Refresh CI status for a set of pull requests.
    ///
    /// Statuses are fetched concurrently, failing the whole call on the
    /// first error, then written in one transaction. Exactly one update
    /// notification fires per call.
    pub async fn refresh_status_for_pull_requests(
        &self,
        pull_requests: &[PullRequest],
        repository: &Repository,
        account: &Account,
    ) -> Result<(), AppError> {
        let (github_repository, repo_db_id) = Self::github_repo_db_id(repository)?;

        let fetches = pull_requests.iter().map(|pr| async move {
            let combined = self
                .api
                .fetch_combined_status(
                    account,
                    &github_repository.owner,
                    &github_repository.name,
                    &pr.head.sha,
                )
                .await?;

            Ok::<_, AppError>(NewPullRequestStatus {
                head_sha: pr.head.sha.clone(),
                pull_request_id: pr.id,
                state: combined.state,
                total_count: combined.total_count,
                checks: combined
                    .statuses
                    .into_iter()
                    .map(|check| StatusCheck {
                        id: check.id,
                        state: check.state,
                        context: check.context,
                    })
                    .collect(),
            })
        });

        let statuses = try_join_all(fetches).await?;
        status::upsert_statuses(&self.pool, &statuses).await?;

        self.events.emit_pull_requests_updated(repo_db_id);
        Ok(())
    }

    /// Single-item convenience form of `refresh_status_for_pull_requests`.
    pub async fn refresh_single_pull_request_status(
        &self,
        pull_request: &PullRequest,
        repository: &Repository,
        account: &Account,
    ) -> Result<(), AppError> {
        self.refresh_status_for_pull_requests(
            std::slice::from_ref(pull_request),
            repository,
            account,
        )
        .await
    }

    /// Refresh status for everything currently cached for a repository.
    ///
    /// Used when the caller has no specific subset in hand.
    pub async fn fetch_pull_request_statuses(
        &self,
        repository: &Repository,
        account: &Account,
    ) -> Result<(), AppError> {
        let pull_requests = self.load_pull_requests_from_cache(repository).await?;
        self.refresh_status_for_pull_requests(&pull_requests, repository, account)
            .await
    }

    /// Remove fork remotes no longer backed by any open pull request.
    ///
    /// Only remotes carrying the fork remote prefix are candidates; the
    /// given pull request list is the source of truth for "still open".
    pub async fn prune_forked_remotes(
        &self,
        repository: &Repository,
        open_pull_requests: &[PullRequest],
    ) -> Result<(), AppError> {
        let remotes = self.git.list_remotes(&repository.path).await?;
        let to_delete = forked_remotes_to_delete(&remotes, open_pull_requests);

        for remote in &to_delete {
            self.git.remove_remote(&repository.path, &remote.name).await?;
        }

        if !to_delete.is_empty() {
            log::info!(
                "Pruned {} stale fork remote(s) from {}",
                to_delete.len(),
                repository.path.display()
            );
        }

        Ok(())
    }

    /// Resolve the repository's upstream identity and local id.
    ///
    /// Both must be present before any sync work starts; their absence is
    /// a caller bug, not a retryable failure.
    fn github_repo_db_id(repository: &Repository) -> Result<(&GitHubRepository, i64), AppError> {
        let github_repository = repository.github_repository.as_ref().ok_or_else(|| {
            AppError::fault("Can only sync pull requests for repositories with an upstream")
        })?;
        let db_id = github_repository
            .db_id
            .ok_or_else(|| AppError::fault("Repository has no local database id"))?;

        Ok((github_repository, db_id))
    }
}

/// Parse ISO 8601 timestamp to Unix timestamp.
fn parse_iso_timestamp(s: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}
