//! Tracked repository models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::PathBuf;

/// A repository on GitHub (or GitHub Enterprise) as known to the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepository {
    /// Local cache row id. `None` until the repository has been stored
    /// through the registry.
    #[sqlx(rename = "id")]
    pub db_id: Option<i64>,

    /// API endpoint the repository lives on, e.g. `https://api.github.com`.
    pub endpoint: String,

    /// Owner login, e.g. `desktop`.
    pub owner: String,

    /// Repository name, e.g. `desktop`.
    pub name: String,

    /// HTTPS clone URL, if known.
    pub clone_url: Option<String>,

    /// Web URL, if known.
    pub html_url: Option<String>,
}

impl GitHubRepository {
    /// `owner/name` as shown in API paths and log lines.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A local checkout tracked by the application.
///
/// `github_repository` is `None` for repositories that have not been
/// associated with an upstream, e.g. a plain local-only checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Application-level repository id.
    pub id: i64,

    /// Absolute path to the working directory.
    pub path: PathBuf,

    /// Upstream identity, once resolved.
    pub github_repository: Option<GitHubRepository>,
}

impl Repository {
    pub fn new(id: i64, path: impl Into<PathBuf>, github_repository: Option<GitHubRepository>) -> Self {
        Self {
            id,
            path: path.into(),
            github_repository,
        }
    }
}
