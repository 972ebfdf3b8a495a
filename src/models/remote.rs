//! Git remote model and fork remote pruning.

use crate::models::pull_request::PullRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Prefix for fork remotes created on the user's behalf when checking out
/// a pull request from a fork. Matches GitHub Desktop's naming so checkouts
/// can move between clients without leaving duplicate remotes behind.
pub const FORKED_REMOTE_PREFIX: &str = "github-desktop-";

/// A git remote as reported by `git remote -v`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// Remote name, e.g. `origin`.
    pub name: String,

    /// Fetch URL.
    pub url: String,
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Whether this remote was created by the app for a fork checkout.
    pub fn is_forked_remote(&self) -> bool {
        self.name.starts_with(FORKED_REMOTE_PREFIX)
    }
}

/// Select the fork remotes that no longer back any open pull request.
///
/// A remote qualifies for deletion when it carries the fork remote prefix
/// and its URL matches none of the open pull requests' head clone URLs.
/// Remotes the user created themselves are never selected, whatever their
/// URL.
pub fn forked_remotes_to_delete(remotes: &[Remote], open_pull_requests: &[PullRequest]) -> Vec<Remote> {
    let open_head_urls: HashSet<&str> = open_pull_requests
        .iter()
        .filter_map(|pr| pr.head.github_repository.as_ref())
        .filter_map(|repo| repo.clone_url.as_deref())
        .collect();

    remotes
        .iter()
        .filter(|remote| remote.is_forked_remote() && !open_head_urls.contains(remote.url.as_str()))
        .cloned()
        .collect()
}
