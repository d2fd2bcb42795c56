//! Git capability backed by the `git` binary and `git2`

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use git2::Repository;
use tokio::process::Command;
use tracing::debug;

use super::status::{count_lines, parse_left_right, parse_shortstat, RepoStatus};
use super::GitCapability;
use crate::{Error, Result};

/// Runs git subprocesses with `-C <path>`
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Path to the git executable
    bin: PathBuf,
    /// Deadline applied to every subprocess
    timeout: Option<Duration>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Use `git` from PATH with no deadline
    pub fn new() -> Self {
        Self {
            bin: PathBuf::from("git"),
            timeout: None,
        }
    }

    /// Set a custom path to the git executable
    pub fn with_path(mut self, bin: impl Into<PathBuf>) -> Self {
        self.bin = bin.into();
        self
    }

    /// Kill any git subprocess that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn git in `path`, honoring the configured deadline
    async fn run(&self, path: &Path, args: &[&str]) -> Result<Output> {
        debug!(path = %path.display(), ?args, "Running git");

        let mut cmd = Command::new(&self.bin);
        cmd.arg("-C")
            .arg(path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| {
                    Error::Git(format!(
                        "git {} timed out after {:?}",
                        args.first().unwrap_or(&""),
                        limit
                    ))
                })?,
            None => cmd.output().await,
        };

        output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Git(format!(
                    "git executable not found at '{}'",
                    self.bin.display()
                ))
            } else {
                Error::Io(e)
            }
        })
    }

    /// Run git and return trimmed combined output
    async fn exec(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.run(path, args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}{}", stdout, stderr).trim().to_string();

        if !output.status.success() {
            return Err(Error::Git(combined));
        }
        Ok(combined)
    }

    /// Run git and return stdout only, for commands whose output is parsed
    async fn query(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.run(path, args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn open(path: &Path) -> Result<Repository> {
        Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Git(format!("Not a git repository: {}", path.display()))
            } else {
                Error::from(e)
            }
        })
    }

    /// Drop a leading `<remote>/` so remote branches check out as local ones
    fn strip_remote(path: &Path, branch: &str) -> Result<String> {
        let repo = Self::open(path)?;
        let remotes = repo.remotes()?;
        let mut branch = branch.to_string();
        for remote in remotes.iter().flatten() {
            if let Some(rest) = branch.strip_prefix(&format!("{}/", remote)) {
                branch = rest.to_string();
            }
        }
        Ok(branch)
    }
}

/// Translate common clone failures into actionable messages
fn classify_clone_error(remote: &str, output: &str) -> Error {
    if output.contains("Authentication failed") || output.contains("Permission denied") {
        return Error::Git(format!(
            "Authentication failed for {}. Check your credentials or repository access.",
            remote
        ));
    }
    if output.contains("Could not resolve host") || output.contains("unable to access") {
        return Error::Git(format!(
            "Network error cloning {}. Check your internet connection.",
            remote
        ));
    }
    if output.contains("not found") || output.contains("does not exist") {
        return Error::Git(format!("Repository not found: {}", remote));
    }
    Error::Git(format!("unable to clone: {}", output))
}

#[async_trait]
impl GitCapability for GitCli {
    fn is_repo(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    async fn remote(&self, path: &Path) -> Result<String> {
        let repo = Self::open(path)?;

        // Try origin first
        if let Ok(remote) = repo.find_remote("origin") {
            if let Some(url) = remote.url() {
                return Ok(url.to_string());
            }
        }

        // Fall back to first available remote
        let remotes = repo.remotes()?;
        for name in remotes.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                if let Some(url) = remote.url() {
                    return Ok(url.to_string());
                }
            }
        }

        Err(Error::Git("no remotes configured".to_string()))
    }

    async fn clone_repo(&self, remote: &str, dest: &Path) -> Result<String> {
        if dest.exists() {
            return Err(Error::Git(format!(
                "directory already exists: {}",
                dest.display()
            )));
        }
        if remote.is_empty() {
            return Err(Error::Git("no source URL to clone from".to_string()));
        }

        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
            debug!(dir = %parent.display(), "Created directory");
        }

        let dest_arg = dest.to_string_lossy();
        self.exec(parent, &["clone", remote, &dest_arg])
            .await
            .map_err(|e| match e {
                Error::Git(output) => classify_clone_error(remote, &output),
                other => other,
            })
    }

    async fn fetch(&self, path: &Path) -> Result<String> {
        self.exec(path, &["fetch", "--all", "--tags", "--prune", "--force"])
            .await
    }

    async fn pull(&self, path: &Path) -> Result<String> {
        self.exec(path, &["pull", "--ff-only", "--stat", "--no-verbose"])
            .await
    }

    async fn current_branch(&self, path: &Path) -> Result<String> {
        let repo = Self::open(path)?;
        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                return Err(Error::Git("branch has no commits yet".to_string()))
            }
            Err(e) => return Err(Error::Git(format!("Failed to get HEAD: {}", e))),
        };

        if head.is_branch() {
            Ok(head.shorthand().unwrap_or("HEAD").to_string())
        } else {
            // Detached HEAD
            Ok("HEAD".to_string())
        }
    }

    async fn refs(&self, path: &Path) -> Result<Vec<String>> {
        let output = self
            .query(
                path,
                &[
                    "for-each-ref",
                    "--format=%(refname:short)",
                    "--sort=-committerdate",
                    "refs/heads",
                    "refs/remotes",
                    "refs/tags",
                ],
            )
            .await?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|r| !r.is_empty() && !r.ends_with("/HEAD"))
            .map(str::to_string)
            .collect())
    }

    async fn checkout(&self, path: &Path, branch: &str) -> Result<String> {
        let local = Self::strip_remote(path, branch)?;
        self.exec(path, &["checkout", &local]).await
    }

    async fn status(&self, path: &Path) -> Result<String> {
        let branch = self.current_branch(path).await?;
        let modified = parse_shortstat(&self.query(path, &["diff", "--shortstat"]).await?);
        let untracked = count_lines(
            &self
                .query(path, &["ls-files", "--others", "--exclude-standard"])
                .await?,
        );

        let upstream = self
            .query(path, &["rev-parse", "--abbrev-ref", "@{upstream}"])
            .await
            .map(|u| u.trim().to_string())
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("origin/{}", branch));
        let range = format!("{}...{}", branch, upstream);
        let divergence = self
            .query(path, &["rev-list", "--left-right", "--count", &range])
            .await
            .ok()
            .and_then(|out| parse_left_right(&out));

        let describe = self
            .query(path, &["describe", "--tags", "--always"])
            .await
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        Ok(RepoStatus {
            branch,
            modified,
            untracked,
            divergence,
            describe,
        }
        .to_string())
    }
}
