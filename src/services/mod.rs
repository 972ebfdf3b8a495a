//! Business logic services.
//!
//! This module contains the sync engine and its collaborators: the GitHub
//! API client, the repository registry, git remote access, event
//! subscriptions, and in-flight fetch bookkeeping.
//!
//! Collaborators sit behind capability traits so the engine is testable
//! with in-memory substitutes.

pub mod fetch_coordinator;
pub mod git_remotes;
pub mod github_client;
pub mod repository_registry;
pub mod store_events;
pub mod sync_engine;

pub use fetch_coordinator::FetchCoordinator;
pub use git_remotes::{CommandGitRemotes, GitRemotes};
pub use github_client::{GitHubApi, GitHubClient, GitHubClientConfig};
pub use repository_registry::{DbRepositoryRegistry, RepositoryRegistry};
pub use store_events::{StoreEvents, Subscription};
pub use sync_engine::SyncEngine;
