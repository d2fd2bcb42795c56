//! Local directory walker

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::RepoProvider;
use crate::config::expand_home;
use crate::git::GitCapability;
use crate::model::{Project, Repository};
use crate::{Error, Result};

/// Discovers working copies under a directory
///
/// A directory holding `.git` is emitted as a repository and its subtree is not
/// searched further, so nested repositories are never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemProvider;

impl FilesystemProvider {
    /// Create the provider
    pub fn new() -> Self {
        Self
    }

    /// Directories under `root` that contain `.git`, outermost only
    pub fn discover(root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path during scan");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.path().join(".git").exists() {
                found.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
        }
        found
    }
}

#[async_trait]
impl RepoProvider for FilesystemProvider {
    async fn load_repos(
        &self,
        search: &str,
        git: &dyn GitCapability,
        project: &mut Project,
    ) -> Result<()> {
        let mut root = expand_home(search);
        if root.is_relative() {
            let base = match project.abs_path.as_deref() {
                Some(base) if !search.starts_with('.') => base.to_path_buf(),
                _ => std::env::current_dir()?,
            };
            root = base.join(root);
        }
        if !root.is_dir() {
            return Err(Error::NotFound(format!("directory {}", root.display())));
        }

        debug!(root = %root.display(), "Searching for repositories");
        project.id = root.to_string_lossy().to_string();

        for dir in Self::discover(&root) {
            project
                .repos
                .push(filesystem_repo(&dir.to_string_lossy(), git).await);
        }
        Ok(())
    }
}

/// A repository for a local directory, with its remote looked up through git
///
/// Missing remotes are not an error; the repository just has no source.
pub async fn filesystem_repo(dir: &str, git: &dyn GitCapability) -> Repository {
    let mut repo = Repository::from_dir(dir);
    let path = expand_home(dir);
    match git.remote(&path).await {
        Ok(src) => repo.src = src,
        Err(e) => debug!(dir, error = %e, "No remote"),
    }
    repo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGit;
    use std::fs;
    use tempfile::TempDir;

    fn make_repo(root: &Path, rel: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(dir.join(".git")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_three_repos_and_plain_dir() {
        let temp = TempDir::new().unwrap();
        make_repo(temp.path(), "alpha");
        make_repo(temp.path(), "beta");
        make_repo(temp.path(), "group/gamma");
        fs::create_dir_all(temp.path().join("plain/docs")).unwrap();

        let git = MockGit::new();
        let mut project = Project::default();
        FilesystemProvider::new()
            .load_repos(&temp.path().to_string_lossy(), &git, &mut project)
            .await
            .unwrap();

        let mut names: Vec<_> = project.repos.iter().map(|r| r.display_name()).collect();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert_eq!(project.id, temp.path().to_string_lossy());
    }

    #[tokio::test]
    async fn test_nested_repo_not_reported() {
        let temp = TempDir::new().unwrap();
        let outer = make_repo(temp.path(), "outer");
        make_repo(&outer, "vendor/inner");

        let found = FilesystemProvider::discover(temp.path());
        assert_eq!(found, vec![outer]);
    }

    #[tokio::test]
    async fn test_remote_is_recorded() {
        let temp = TempDir::new().unwrap();
        let dir = make_repo(temp.path(), "tool");

        let git = MockGit::new().with_remote(&dir, "git@github.com:me/tool.git");
        let repo = filesystem_repo(&dir.to_string_lossy(), &git).await;
        assert_eq!(repo.src, "git@github.com:me/tool.git");
        assert_eq!(repo.name, "tool");
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let mut project = Project::default();
        let err = FilesystemProvider::new()
            .load_repos(&missing.to_string_lossy(), &MockGit::new(), &mut project)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
