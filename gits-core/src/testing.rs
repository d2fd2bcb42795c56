//! Scripted collaborators for unit tests

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::git::GitCapability;
use crate::model::{Project, SourceKind};
use crate::providers::{FilesystemProvider, ProviderFactory, RepoProvider};
use crate::{Error, Result};

/// Git double: a directory is a repository when it holds `.git`
#[derive(Debug, Default)]
pub struct MockGit {
    remotes: HashMap<PathBuf, String>,
    failing: HashSet<PathBuf>,
    panicking: HashSet<PathBuf>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self, path: &Path, url: &str) -> Self {
        self.remotes.insert(path.to_path_buf(), url.to_string());
        self
    }

    pub fn failing_at(mut self, path: &Path) -> Self {
        self.failing.insert(path.to_path_buf());
        self
    }

    pub fn panicking_at(mut self, path: &Path) -> Self {
        self.panicking.insert(path.to_path_buf());
        self
    }

    /// Make every fetch take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Most fetches observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, path: &Path) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", op, path.display()));
        if self.panicking.contains(path) {
            panic!("scripted panic in {}", path.display());
        }
        if self.failing.contains(path) {
            return Err(Error::Git(format!("scripted {} failure", op)));
        }
        Ok(format!("{} ok", op))
    }
}

#[async_trait]
impl GitCapability for MockGit {
    fn is_repo(&self, path: &Path) -> bool {
        path.join(".git").is_dir()
    }

    async fn remote(&self, path: &Path) -> Result<String> {
        self.remotes
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Git("no remotes configured".to_string()))
    }

    async fn clone_repo(&self, _remote: &str, dest: &Path) -> Result<String> {
        if dest.exists() {
            return Err(Error::Git(format!(
                "directory already exists: {}",
                dest.display()
            )));
        }
        let output = self.record("clone", dest)?;
        std::fs::create_dir_all(dest.join(".git"))?;
        Ok(output)
    }

    async fn fetch(&self, path: &Path) -> Result<String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record("fetch", path)
    }

    async fn pull(&self, path: &Path) -> Result<String> {
        self.record("pull", path)
    }

    async fn current_branch(&self, _path: &Path) -> Result<String> {
        Ok("main".to_string())
    }

    async fn refs(&self, _path: &Path) -> Result<Vec<String>> {
        Ok(vec!["main".to_string(), "origin/main".to_string()])
    }

    async fn checkout(&self, path: &Path, branch: &str) -> Result<String> {
        self.record(&format!("checkout {}", branch), path)
    }

    async fn status(&self, path: &Path) -> Result<String> {
        self.record("status", path)
    }
}

/// Provider factory serving canned results for hosted kinds
///
/// Filesystem sources use the real walker.
#[derive(Debug, Default, Clone)]
pub struct StaticProviders {
    results: HashMap<SourceKind, Project>,
    calls: Arc<AtomicUsize>,
}

impl StaticProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the repositories and sub-projects of `result` for `kind`
    pub fn with(mut self, kind: SourceKind, result: Project) -> Self {
        self.results.insert(kind, result);
        self
    }

    /// Number of hosted fetches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct StaticProvider {
    result: Option<Project>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RepoProvider for StaticProvider {
    async fn load_repos(
        &self,
        search: &str,
        _git: &dyn GitCapability,
        project: &mut Project,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .result
            .clone()
            .ok_or_else(|| Error::Provider(format!("unreachable: {}", search)))?;
        project.id = search.to_string();
        project.repos.extend(result.repos);
        project.sub_projects.extend(result.sub_projects);
        Ok(())
    }
}

impl ProviderFactory for StaticProviders {
    fn create(&self, kind: SourceKind) -> Result<Box<dyn RepoProvider>> {
        if kind == SourceKind::Filesystem {
            return Ok(Box::new(FilesystemProvider::new()));
        }
        Ok(Box::new(StaticProvider {
            result: self.results.get(&kind).cloned(),
            calls: Arc::clone(&self.calls),
        }))
    }
}
