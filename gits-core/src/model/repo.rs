//! Repository model and on-disk state

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::SourceKind;

/// Name shown for a repository that declares nothing to derive a name from
pub const UNNAMED: &str = "<unnamed>";

/// On-disk condition of a repository, computed on every resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoState {
    /// Not evaluated yet; never visible outside the resolver
    #[default]
    Unknown,
    /// Hosted repository without a resolvable local path
    Remote,
    /// Local path resolves but nothing exists there
    NoLocal,
    /// Path resolution failed, or the path is not a git working copy
    Error,
    /// Local path is a valid git working copy
    Ok,
}

impl RepoState {
    /// Short label for listings
    pub fn label(&self) -> &'static str {
        match self {
            RepoState::Unknown => "Unknown",
            RepoState::Remote => "Remote",
            RepoState::NoLocal => "N/A",
            RepoState::Error => "Error",
            RepoState::Ok => "OK",
        }
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single repository from the filesystem or a git provider
///
/// Only declared and fetched fields are serialized; `abs_path`, `state`,
/// `reason` and `kind` are recomputed on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    /// Provider-side identifier
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Explicit name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Owner, group path or workspace on the provider
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Clone address
    #[serde(skip_serializing_if = "String::is_empty")]
    pub src: String,

    /// Declared local directory, absolute or relative to the project path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dir: String,

    /// Web URL for display
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub desc: String,

    /// Source kind of the owning project
    #[serde(skip)]
    pub kind: Option<SourceKind>,

    /// Resolved local path
    #[serde(skip)]
    pub abs_path: Option<PathBuf>,

    /// Resolved on-disk state
    #[serde(skip)]
    pub state: RepoState,

    /// Why the state is `Error`, when it is
    #[serde(skip)]
    pub reason: String,
}

impl Repository {
    /// A repository known only by its local directory
    pub fn from_dir(dir: impl Into<String>) -> Self {
        let dir = dir.into();
        Self {
            name: basename(&dir).to_string(),
            dir,
            ..Default::default()
        }
    }

    /// Display name: explicit name, then directory basename, then source basename
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.dir.is_empty() {
            return basename(&self.dir).to_string();
        }
        if !self.src.is_empty() {
            return basename(&self.src).to_string();
        }
        UNNAMED.to_string()
    }

    /// Display name prefixed with the namespace, if any
    pub fn namespaced_name(&self) -> String {
        let name = self.display_name();
        if self.namespace.is_empty() {
            name
        } else {
            format!("{}/{}", self.namespace, name)
        }
    }

    /// Whether any of the given filters names this repository
    ///
    /// Matches the bare name, the namespace, or the namespaced name.
    pub fn matches_any(&self, filters: &[String]) -> bool {
        let keys = [self.display_name(), self.namespace.clone(), self.namespaced_name()];
        filters
            .iter()
            .any(|filter| !filter.is_empty() && keys.iter().any(|k| k == filter))
    }

    /// Clone address, or the failure reason when there is none
    pub fn source_or_reason(&self) -> &str {
        if self.src.is_empty() {
            &self.reason
        } else {
            &self.src
        }
    }

    /// Resolved path for display, empty when there is none
    pub fn path_display(&self) -> String {
        self.abs_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn mark(&mut self, state: RepoState, reason: impl Into<String>) {
        self.state = state;
        self.reason = reason.into();
    }
}

/// Last path segment of a path or URL, ignoring trailing separators
pub(crate) fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return path;
    }
    Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .or_else(|| trimmed.rsplit(['/', ':']).next())
        .unwrap_or(trimmed)
}
