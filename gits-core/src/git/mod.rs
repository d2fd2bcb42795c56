//! Git capability used by the resolver and the bulk executor
//!
//! The core never talks to git directly; it goes through [`GitCapability`].
//! [`GitCli`] is the implementation backed by the `git` binary and `git2`.

mod cli;
mod status;
mod url;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

pub use cli::GitCli;
pub use status::RepoStatus;
pub use url::{dir_name_from_source, RemoteUrl};

/// Operations the core needs from git, all against a local path
#[async_trait]
pub trait GitCapability: Send + Sync {
    /// Whether `path` is the root of a git working copy
    fn is_repo(&self, path: &Path) -> bool;

    /// URL of the default remote
    async fn remote(&self, path: &Path) -> Result<String>;

    /// Clone `remote` into `dest`; fails if `dest` already exists
    async fn clone_repo(&self, remote: &str, dest: &Path) -> Result<String>;

    /// Fetch all remotes, tags, and prune
    async fn fetch(&self, path: &Path) -> Result<String>;

    /// Fast-forward pull of the current branch
    async fn pull(&self, path: &Path) -> Result<String>;

    /// Name of the checked-out branch
    async fn current_branch(&self, path: &Path) -> Result<String>;

    /// Local branches, remote branches and tags, most recent first
    async fn refs(&self, path: &Path) -> Result<Vec<String>>;

    /// Switch to `branch`, creating a tracking branch for `<remote>/<branch>`
    async fn checkout(&self, path: &Path, branch: &str) -> Result<String>;

    /// One-line working copy summary
    async fn status(&self, path: &Path) -> Result<String>;
}
