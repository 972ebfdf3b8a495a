//! Git remote listing and removal via the git CLI.

use crate::error::AppError;
use crate::models::Remote;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Version-control surface the sync engine consumes.
#[async_trait]
pub trait GitRemotes: Send + Sync {
    /// List the remotes configured in a checkout.
    async fn list_remotes(&self, path: &Path) -> Result<Vec<Remote>, AppError>;

    /// Remove a remote by name.
    async fn remove_remote(&self, path: &Path, name: &str) -> Result<(), AppError>;
}

/// `GitRemotes` implementation shelling out to the git CLI.
pub struct CommandGitRemotes;

impl CommandGitRemotes {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CommandGitRemotes {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRemotes for CommandGitRemotes {
    async fn list_remotes(&self, path: &Path) -> Result<Vec<Remote>, AppError> {
        let output = run_git(path, &["remote", "-v"]).await?;
        Ok(parse_remotes(&output))
    }

    async fn remove_remote(&self, path: &Path, name: &str) -> Result<(), AppError> {
        run_git(path, &["remote", "remove", name]).await?;
        log::debug!("Removed remote '{}' from {}", name, path.display());
        Ok(())
    }
}

/// Run a git command and return stdout on success.
async fn run_git(path: &Path, args: &[&str]) -> Result<String, AppError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(path).args(args);

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::git("git not found in PATH")
        } else {
            AppError::git(format!("Failed to run git: {}", e))
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(AppError::git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr
        )))
    }
}

/// Parse `git remote -v` output into deduplicated remotes.
///
/// Each remote is listed twice (fetch and push); only the fetch line is kept.
fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes = Vec::new();

    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        if parts.next() != Some("(fetch)") {
            continue;
        }
        remotes.push(Remote::new(name, url));
    }

    remotes
}
