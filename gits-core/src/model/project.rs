//! Project tree model

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::repo::basename;
use super::{ProviderSource, Repository, SourceKind};

/// A named node holding repositories and nested sub-projects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Provider-side identifier (group id, owner id, walked path)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Project name; the config key for top-level projects
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Local base directory, absolute, `~`-relative or relative to the parent
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub desc: String,

    /// Where repositories are discovered from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderSource>,

    /// Tri-state clone flag: `None` inherits, which ultimately means enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone: Option<bool>,

    /// Only keep repositories matching one of these names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Drop repositories matching one of these names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Repositories at this level
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<Repository>,

    /// Nested projects
    #[serde(rename = "subprojects", skip_serializing_if = "Vec::is_empty")]
    pub sub_projects: Vec<Project>,

    /// Digest of the project declaration, checked on cache reads
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_hash: String,

    /// Resolved base directory
    #[serde(skip)]
    pub abs_path: Option<PathBuf>,
}

/// A direct child of a project picked by name
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// A repository at this level
    Repo(&'a Repository),
    /// A sub-project, possibly nested (`a/b`)
    SubProject(&'a Project),
}

impl Project {
    /// Whether a command-line argument refers to a directory rather than a project name
    pub fn is_path_like(arg: &str) -> bool {
        arg == "."
            || arg == ".."
            || arg.starts_with('/')
            || arg.starts_with("./")
            || arg.starts_with("../")
            || arg.starts_with('~')
    }

    /// An ad-hoc filesystem project rooted at `path`
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { path } else { trimmed.to_string() };

        let name = match path.as_str() {
            "." | ".." => std::env::current_dir()
                .ok()
                .and_then(|cwd| {
                    let dir = if path == ".." { cwd.parent()?.to_path_buf() } else { cwd };
                    dir.file_name().map(|n| n.to_string_lossy().to_string())
                })
                .unwrap_or_else(|| path.clone()),
            _ => basename(&path).to_string(),
        };

        Self {
            name,
            source: Some(ProviderSource::new(SourceKind::Filesystem, path.clone())),
            path,
            ..Default::default()
        }
    }

    /// Whether cloning is enabled for this project
    pub fn clone_enabled(&self) -> bool {
        self.clone.unwrap_or(true)
    }

    /// Source kind if a valid one is declared
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().and_then(|s| s.source_kind().ok())
    }

    /// Human-readable source label, `-` when none
    pub fn source_label(&self) -> String {
        match &self.source {
            Some(source) if !source.is_empty() => {
                if source.search.is_empty() {
                    source.kind.clone()
                } else {
                    format!("{}:{}", source.kind, source.search)
                }
            }
            _ => "-".to_string(),
        }
    }

    /// SHA-256 of the declaration, excluding any previously computed hash
    pub fn declaration_hash(&self) -> String {
        let mut declared = self.clone();
        declared.content_hash.clear();
        let bytes = serde_json::to_vec(&declared).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Number of repositories in the whole tree
    pub fn repo_count(&self) -> usize {
        self.repos.len()
            + self
                .sub_projects
                .iter()
                .map(Project::repo_count)
                .sum::<usize>()
    }

    /// All repositories in the tree, depth-first
    pub fn all_repos(&self) -> Vec<&Repository> {
        let mut repos: Vec<&Repository> = self.repos.iter().collect();
        for sub in &self.sub_projects {
            repos.extend(sub.all_repos());
        }
        repos
    }

    /// Resolved paths of every repository in the tree
    pub fn known_paths(&self) -> Vec<&Path> {
        self.all_repos()
            .into_iter()
            .filter_map(|r| r.abs_path.as_deref())
            .collect()
    }

    /// Find a sub-project by name, or a nested one by `a/b` path
    pub fn find_sub_project(&self, path: &str) -> Option<&Project> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.sub_projects.iter().find(|p| p.name == segment)?;
        }
        if std::ptr::eq(current, self) {
            None
        } else {
            Some(current)
        }
    }

    /// Pick a repository (by name or namespaced name) or a sub-project
    pub fn select(&self, name: &str) -> Option<Selection<'_>> {
        if let Some(repo) = self
            .repos
            .iter()
            .find(|r| r.display_name() == name || r.namespaced_name() == name)
        {
            return Some(Selection::Repo(repo));
        }
        self.find_sub_project(name).map(Selection::SubProject)
    }

    /// Apply include/exclude filters to this level; exclude wins
    pub fn apply_filters(&mut self) {
        if self.include.is_empty() && self.exclude.is_empty() {
            return;
        }
        let include = &self.include;
        let exclude = &self.exclude;
        self.repos.retain(|repo| {
            if repo.matches_any(exclude) {
                return false;
            }
            include.is_empty() || repo.matches_any(include)
        });
    }

    /// Sort sub-projects and repositories by name
    pub fn sort(&mut self) {
        self.sub_projects.sort_by(|a, b| a.name.cmp(&b.name));
        self.repos.sort_by_key(Repository::display_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn project_with(names: &[&str]) -> Project {
        Project {
            name: "p".to_string(),
            repos: names.iter().map(|n| repo(n)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let mut project = project_with(&["a", "b", "c"]);
        project.include = vec!["a".to_string(), "b".to_string()];
        project.exclude = vec!["b".to_string()];
        project.apply_filters();

        let names: Vec<_> = project.repos.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_empty_include_keeps_all_but_excluded() {
        let mut project = project_with(&["a", "b", "c"]);
        project.exclude = vec!["b".to_string()];
        project.apply_filters();

        let names: Vec<_> = project.repos.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_sort_is_alphabetical() {
        let mut project = project_with(&["zeta", "alpha", "mid"]);
        project.sub_projects = vec![
            Project {
                name: "y".to_string(),
                ..Default::default()
            },
            Project {
                name: "b".to_string(),
                ..Default::default()
            },
        ];
        project.sort();

        let names: Vec<_> = project.repos.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(project.sub_projects[0].name, "b");
    }

    #[test]
    fn test_is_path_like() {
        assert!(Project::is_path_like("."));
        assert!(Project::is_path_like("./code"));
        assert!(Project::is_path_like("../code"));
        assert!(Project::is_path_like("/abs"));
        assert!(Project::is_path_like("~/code"));
        assert!(!Project::is_path_like("work"));
    }

    #[test]
    fn test_from_path() {
        let project = Project::from_path("/home/me/code/");
        assert_eq!(project.name, "code");
        assert_eq!(project.path, "/home/me/code");
        assert_eq!(project.source_kind(), Some(SourceKind::Filesystem));
    }

    #[test]
    fn test_select_repo_and_nested_sub_project() {
        let mut project = project_with(&["a"]);
        project.sub_projects = vec![Project {
            name: "group".to_string(),
            sub_projects: vec![Project {
                name: "inner".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }];

        assert!(matches!(project.select("a"), Some(Selection::Repo(_))));
        match project.select("group/inner") {
            Some(Selection::SubProject(p)) => assert_eq!(p.name, "inner"),
            other => panic!("unexpected selection: {:?}", other),
        }
        assert!(project.select("missing").is_none());
        assert!(project.select("").is_none());
    }

    #[test]
    fn test_declaration_hash_changes_with_declaration() {
        let mut project = project_with(&["a"]);
        let first = project.declaration_hash();
        project.content_hash = first.clone();
        assert_eq!(project.declaration_hash(), first);

        project.exclude.push("a".to_string());
        assert_ne!(project.declaration_hash(), first);
    }

    #[test]
    fn test_repo_count_spans_tree() {
        let mut project = project_with(&["a", "b"]);
        project.sub_projects.push(project_with(&["c"]));
        assert_eq!(project.repo_count(), 3);
        assert_eq!(project.all_repos().len(), 3);
    }
}
