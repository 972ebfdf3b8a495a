//! Data models for the sync core.

pub mod account;
pub mod pull_request;
pub mod remote;
pub mod repository;
pub mod status;

pub use account::Account;
pub use pull_request::{NewPullRequestRecord, PullRequest, PullRequestRecord, PullRequestRef};
pub use remote::{forked_remotes_to_delete, Remote, FORKED_REMOTE_PREFIX};
pub use repository::{GitHubRepository, Repository};
pub use status::{NewPullRequestStatus, PullRequestStatus, StatusCheck, StatusState};
