//! Local-first pull request synchronization core.
//!
//! Keeps a SQLite cache of pull request metadata and CI status consistent
//! with GitHub (or GitHub Enterprise), and prunes fork remotes that no
//! longer back any open pull request. The consuming application owns
//! accounts, tracked repositories, and refresh scheduling; this crate owns
//! the cache, the sync cycle, and its observable state.
//!
//! Typical usage:
//!
//! ```no_run
//! use hubdesk_sync::db;
//! use hubdesk_sync::models::{Account, Repository};
//! use hubdesk_sync::services::SyncEngine;
//!
//! # async fn run(repository: Repository, account: Account) -> Result<(), hubdesk_sync::error::AppError> {
//! let db_path = db::get_db_path(std::path::Path::new("/var/lib/myapp"));
//! let pool = db::initialize(&db_path).await?;
//! let engine = SyncEngine::with_defaults(pool)?;
//!
//! let _subscription = engine.on_pull_requests_updated(|repository_id| {
//!     println!("repository {} changed", repository_id);
//! });
//!
//! engine.fetch_pull_requests(&repository, &account).await?;
//! let pull_requests = engine.load_pull_requests_from_cache(&repository).await?;
//! # let _ = pull_requests;
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::AppError;
pub use models::{Account, PullRequest, Repository};
pub use services::SyncEngine;
