//! Working copies on disk that no project declares

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::git::GitCapability;
use crate::model::Project;
use crate::providers::FilesystemProvider;
use crate::{Error, Result};

/// Git working copies under the project's directory that the resolved tree
/// does not know about
///
/// Scanning stops at every repository, so repositories nested inside a known
/// one are not reported.
pub fn find_orphans(project: &Project, git: &dyn GitCapability) -> Result<Vec<PathBuf>> {
    let root = project
        .abs_path
        .as_deref()
        .ok_or_else(|| Error::Config(format!("project {:?} has no path", project.name)))?;
    if !root.is_dir() {
        return Err(Error::NotFound(format!("directory {}", root.display())));
    }

    let known: HashSet<_> = project.known_paths().into_iter().collect();
    let orphans: Vec<PathBuf> = FilesystemProvider::discover(root)
        .into_iter()
        .filter(|dir| !known.contains(dir.as_path()) && git.is_repo(dir))
        .collect();

    debug!(
        project = %project.name,
        known = known.len(),
        orphans = orphans.len(),
        "Orphan scan finished"
    );
    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Repository;
    use crate::testing::MockGit;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reports_undeclared_repos() {
        let temp = TempDir::new().unwrap();
        for name in ["declared", "stray", "group/also-stray"] {
            fs::create_dir_all(temp.path().join(name).join(".git")).unwrap();
        }

        let project = Project {
            name: "code".to_string(),
            abs_path: Some(temp.path().to_path_buf()),
            repos: vec![Repository {
                name: "declared".to_string(),
                abs_path: Some(temp.path().join("declared")),
                ..Default::default()
            }],
            ..Default::default()
        };

        let orphans = find_orphans(&project, &MockGit::new()).unwrap();
        assert_eq!(
            orphans,
            vec![
                temp.path().join("group/also-stray"),
                temp.path().join("stray"),
            ]
        );
    }

    #[test]
    fn test_requires_path() {
        let err = find_orphans(&Project::default(), &MockGit::new()).unwrap_err();
        assert!(err.is_config());
    }
}
