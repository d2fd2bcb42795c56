//! Bulk git execution over a resolved project tree
//!
//! Repositories within one project level run concurrently, bounded by a
//! semaphore. Sub-projects run one after another, depth-first. A failing or
//! panicking repository is recorded and never stops its siblings.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error};

use crate::config::DEFAULT_WORKERS;
use crate::git::GitCapability;
use crate::model::{Project, RepoState, Repository};
use crate::{Error, Result};

/// A git operation applied to every repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Clone repositories that are not on disk yet
    Clone,
    /// Fetch all remotes
    Fetch,
    /// Fast-forward pull
    Pull,
    /// Switch every repository to a branch
    Checkout {
        /// Branch, possibly prefixed with a remote name
        branch: String,
    },
    /// One-line working copy summary
    Status,
}

impl Operation {
    /// Command name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Clone => "clone",
            Operation::Fetch => "fetch",
            Operation::Pull => "pull",
            Operation::Checkout { .. } => "checkout",
            Operation::Status => "status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A repository whose operation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Repository display name
    pub repository: String,
    /// Resolved local directory, empty when there is none
    pub directory: String,
    /// Error text
    pub message: String,
}

impl BulkFailure {
    fn new(repo: &Repository, message: impl Into<String>) -> Self {
        Self {
            repository: repo.display_name(),
            directory: repo.path_display(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BulkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directory.is_empty() {
            write!(f, "{}: {}", self.repository, self.message)
        } else {
            write!(f, "{} ({}): {}", self.repository, self.directory, self.message)
        }
    }
}

/// A repository whose operation succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    /// Name of the project level the repository belongs to
    pub project: String,
    /// Repository display name
    pub repository: String,
    /// Resolved local directory
    pub directory: String,
    /// Git output
    pub output: String,
}

/// Everything a bulk run produced
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Successful repositories, grouped by project level in traversal order
    pub outcomes: Vec<RepoOutcome>,
    /// Failed repositories
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    /// Whether no repository failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed repositories
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    /// `Err` summarizing the failures, if any
    pub fn check(&self, op: &Operation) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(Error::Other(format!(
            "{} completed with {} errors",
            op,
            self.error_count()
        )))
    }
}

/// Runs one operation across a project tree
#[derive(Clone)]
pub struct Executor {
    git: Arc<dyn GitCapability>,
    workers: usize,
}

impl Executor {
    /// Executor allowing `workers` operations in flight (at least one)
    pub fn new(git: Arc<dyn GitCapability>, workers: usize) -> Self {
        Self {
            git,
            workers: workers.max(1),
        }
    }

    /// Executor with the default worker count
    pub fn with_default_workers(git: Arc<dyn GitCapability>) -> Self {
        Self::new(git, DEFAULT_WORKERS)
    }

    /// Run `op` on every repository in the tree
    pub async fn run(&self, project: &Project, op: &Operation) -> BulkReport {
        let mut report = BulkReport::default();
        let mut pending = vec![project];

        while let Some(level) = pending.pop() {
            self.run_level(level, op, &mut report).await;
            pending.extend(level.sub_projects.iter().rev());
        }

        debug!(
            op = %op,
            ok = report.outcomes.len(),
            failed = report.failures.len(),
            "Bulk run finished"
        );
        report
    }

    /// Run `op` on a single repository of `project`
    pub async fn run_repo(
        &self,
        project: &Project,
        repo: &Repository,
        op: &Operation,
    ) -> std::result::Result<RepoOutcome, BulkFailure> {
        if *op == Operation::Clone && !project.clone_enabled() {
            return Err(BulkFailure::new(repo, "cloning is disabled for this project"));
        }
        check_dispatch(repo, op).map_err(|msg| BulkFailure::new(repo, msg))?;

        match execute(self.git.as_ref(), repo, op).await {
            Ok(output) => Ok(outcome(&project.name, repo, output)),
            Err(e) => Err(BulkFailure::new(repo, e.to_string())),
        }
    }

    async fn run_level(&self, level: &Project, op: &Operation, report: &mut BulkReport) {
        if *op == Operation::Clone && !level.clone_enabled() {
            debug!(project = %level.name, "Cloning disabled, skipping repositories");
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for repo in &level.repos {
            if let Err(message) = check_dispatch(repo, op) {
                failures.lock().await.push(BulkFailure::new(repo, message));
                continue;
            }

            let git = Arc::clone(&self.git);
            let semaphore = Arc::clone(&semaphore);
            let failures = Arc::clone(&failures);
            let repo_owned = repo.clone();
            let op = op.clone();
            let project = level.name.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                match execute(git.as_ref(), &repo_owned, &op).await {
                    Ok(output) => Some(outcome(&project, &repo_owned, output)),
                    Err(e) => {
                        failures
                            .lock()
                            .await
                            .push(BulkFailure::new(&repo_owned, e.to_string()));
                        None
                    }
                }
            });
            handles.push((repo, handle));
        }

        for (repo, handle) in handles {
            match handle.await {
                Ok(Some(done)) => report.outcomes.push(done),
                Ok(None) => {}
                Err(e) => {
                    // Task panicked; we know which repository it was from the pairing
                    error!(repo = %repo.display_name(), error = %e, "Task panicked");
                    failures
                        .lock()
                        .await
                        .push(BulkFailure::new(repo, format!("task panicked: {}", e)));
                }
            }
        }

        report.failures.extend(failures.lock().await.drain(..));
    }
}

fn outcome(project: &str, repo: &Repository, output: String) -> RepoOutcome {
    RepoOutcome {
        project: project.to_string(),
        repository: repo.display_name(),
        directory: repo.path_display(),
        output,
    }
}

/// Whether `op` may run given the repository's state
fn check_dispatch(repo: &Repository, op: &Operation) -> std::result::Result<(), String> {
    let is_clone = *op == Operation::Clone;
    match repo.state {
        RepoState::NoLocal if is_clone => Ok(()),
        RepoState::Ok if is_clone => Err("already cloned".to_string()),
        RepoState::Ok => Ok(()),
        RepoState::NoLocal => Err("not cloned".to_string()),
        RepoState::Remote => Err("no local path".to_string()),
        RepoState::Error if repo.reason.is_empty() => Err("not a git repository".to_string()),
        RepoState::Error => Err(repo.reason.clone()),
        RepoState::Unknown => Err("state unknown".to_string()),
    }
}

async fn execute(git: &dyn GitCapability, repo: &Repository, op: &Operation) -> Result<String> {
    let path = repo
        .abs_path
        .as_deref()
        .ok_or_else(|| Error::Git("no local path".to_string()))?;

    match op {
        Operation::Clone => {
            if repo.src.is_empty() {
                return Err(Error::Git("missing source address".to_string()));
            }
            git.clone_repo(&repo.src, path).await
        }
        Operation::Fetch => git.fetch(path).await,
        Operation::Pull => {
            let branch = git.current_branch(path).await?;
            let output = git.pull(path).await?;
            Ok(format!("[{}] {}", branch, output))
        }
        Operation::Checkout { branch } => git.checkout(path, branch).await,
        Operation::Status => git.status(path).await,
    }
}
