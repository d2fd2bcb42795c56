//! Repository discovery
//!
//! Every source kind implements [`RepoProvider`]. The resolver asks a
//! [`ProviderFactory`] for the provider matching a project's source type, so the
//! hosted clients can live in another crate while the filesystem walker stays
//! here.

mod filesystem;

use async_trait::async_trait;

use crate::git::GitCapability;
use crate::model::{Project, SourceKind};
use crate::Result;

pub use filesystem::{filesystem_repo, FilesystemProvider};

/// Populates a project's repositories (and sub-projects) from one source
#[async_trait]
pub trait RepoProvider: Send + Sync {
    /// Fill `project.repos`, and `project.sub_projects` for providers with groups
    ///
    /// `search` is the provider-specific key: owner, group id or directory.
    async fn load_repos(
        &self,
        search: &str,
        git: &dyn GitCapability,
        project: &mut Project,
    ) -> Result<()>;
}

/// Selects the provider for a source kind
pub trait ProviderFactory: Send + Sync {
    /// Provider for `kind`
    fn create(&self, kind: SourceKind) -> Result<Box<dyn RepoProvider>>;
}
