//! Project resolution
//!
//! Turns declared projects into fully populated trees: repositories are fetched
//! from providers (through the cache), every repository gets a local path and a
//! state, filters are applied and the result is sorted.
//!
//! Resolution is top-down. A project's base directory is fixed before any of
//! its children are visited, and children receive a copy of what they inherit
//! (base directory, source, clone flag, filters) rather than a reference to
//! their parent.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{key_for, CacheStore};
use crate::config::expand_home;
use crate::git::{dir_name_from_source, GitCapability};
use crate::model::{Project, ProviderSource, RepoState, Repository, SourceKind};
use crate::providers::ProviderFactory;
use crate::{Error, Result};

/// A requested project that could not be resolved
#[derive(Debug)]
pub struct ProjectFailure {
    /// Requested name
    pub name: String,
    /// What went wrong
    pub error: Error,
}

/// Outcome of resolving several projects
#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved projects by name
    pub projects: BTreeMap<String, Project>,
    /// Projects that failed, each independently of the others
    pub failures: Vec<ProjectFailure>,
}

impl Resolution {
    /// Whether every requested project resolved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Take one project out, or the error that prevented it
    pub fn take(&mut self, name: &str) -> Result<Project> {
        if let Some(project) = self.projects.remove(name) {
            return Ok(project);
        }
        match self.failures.iter().position(|f| f.name == name) {
            Some(idx) => Err(self.failures.remove(idx).error),
            None => Err(Error::NotFound(format!("project {:?}", name))),
        }
    }

    /// The only resolved project, for single-name requests
    pub fn into_single(mut self) -> Result<Project> {
        if let Some(failure) = self.failures.pop() {
            return Err(failure.error);
        }
        let name = self
            .projects
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| Error::NotFound("project".to_string()))?;
        self.take(&name)
    }
}

/// What a child copies from its parent when it declares nothing itself
#[derive(Debug, Clone, Default)]
struct Inherited {
    abs_path: Option<PathBuf>,
    source: Option<ProviderSource>,
    clone: Option<bool>,
    include: Vec<String>,
    exclude: Vec<String>,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves declared projects into stateful trees
#[derive(Clone)]
pub struct Resolver {
    git: Arc<dyn GitCapability>,
    providers: Arc<dyn ProviderFactory>,
    cache: Option<Arc<dyn CacheStore>>,
}

impl Resolver {
    /// Resolver without a cache; every hosted source is fetched
    pub fn new(git: Arc<dyn GitCapability>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            git,
            providers,
            cache: None,
        }
    }

    /// Consult and populate `cache` for hosted sources
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Git capability used for state checks
    pub fn git(&self) -> Arc<dyn GitCapability> {
        Arc::clone(&self.git)
    }

    /// Resolve the named projects, or all of them when `names` is empty
    ///
    /// A path-like first name (`.`, `/…`, `./…`, `../…`, `~…`) resolves an ad-hoc
    /// filesystem project and the remaining names are ignored. One project
    /// failing never prevents the others from resolving.
    pub async fn resolve(
        &self,
        names: &[String],
        projects: &BTreeMap<String, Project>,
    ) -> Resolution {
        let (selected, failures) = select(names, projects);
        let mut resolution = Resolution {
            projects: BTreeMap::new(),
            failures,
        };

        for (name, project) in selected {
            match self.resolve_project(project).await {
                Ok(project) => {
                    resolution.projects.insert(name, project);
                }
                Err(error) => {
                    warn!(project = %name, error = %error, "Failed to resolve project");
                    resolution.failures.push(ProjectFailure { name, error });
                }
            }
        }
        resolution
    }

    /// Drop cached results for the selected projects, then resolve them again
    pub async fn sync(
        &self,
        names: &[String],
        projects: &BTreeMap<String, Project>,
    ) -> Resolution {
        if let Some(cache) = &self.cache {
            let (selected, _) = select(names, projects);
            for (name, project) in &selected {
                for declared in sourced_projects(project) {
                    if let Err(e) = cache.flush(declared) {
                        warn!(project = %name, error = %e, "Failed to flush cache");
                    }
                }
            }
        }
        self.resolve(names, projects).await
    }

    /// Resolve one declared project
    pub async fn resolve_project(&self, mut project: Project) -> Result<Project> {
        self.populate(&mut project, None).await?;
        Ok(project)
    }

    fn populate<'a>(
        &'a self,
        project: &'a mut Project,
        parent: Option<Inherited>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let parent = parent.unwrap_or_default();
            project.abs_path = project_base(project, parent.abs_path.as_deref())?;

            if project.clone.is_none() {
                project.clone = parent.clone;
            }
            if project.include.is_empty() && project.exclude.is_empty() {
                project.include = parent.include.clone();
                project.exclude = parent.exclude.clone();
            }

            let declares_source = project.source.as_ref().is_some_and(|s| !s.is_empty());
            if declares_source {
                default_filesystem_search(project);
                self.fetch(project).await?;
            } else if parent.source.is_some() {
                project.source = parent.source.clone();
            } else if project.repos.is_empty() {
                project.source = Some(ProviderSource::new(SourceKind::Filesystem, ""));
                default_filesystem_search(project);
                self.fetch(project).await?;
            } else {
                debug!(project = %project.name, "Using declared repositories");
            }

            let kind = project.source_kind();
            let base = project.abs_path.clone();
            for repo in project.repos.iter_mut() {
                self.compute_state(repo, base.as_deref(), kind).await;
            }

            let inherited = Inherited {
                abs_path: project.abs_path.clone(),
                source: project.source.clone().filter(|s| !s.is_empty()),
                clone: project.clone,
                include: project.include.clone(),
                exclude: project.exclude.clone(),
            };
            for sub in project.sub_projects.iter_mut() {
                self.populate(sub, Some(inherited.clone())).await?;
            }

            project.apply_filters();
            project.sort();
            Ok(())
        })
    }

    /// Populate repositories from the project's own source, via the cache
    async fn fetch(&self, project: &mut Project) -> Result<()> {
        let source = project
            .source
            .clone()
            .ok_or_else(|| Error::Config(format!("project {:?} has no source", project.name)))?;
        let kind = source.validate()?;

        let cache = match &self.cache {
            Some(cache) if kind.is_cacheable() => Some(cache),
            _ => None,
        };
        let key = source.cache_key();
        project.content_hash = project.declaration_hash();

        if let Some(cache) = cache {
            match cache.get(&key, project) {
                Ok(true) => {
                    debug!(project = %project.name, key = %key, "Using cached repositories");
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "Cache read failed"),
            }
        }

        if kind == SourceKind::Filesystem {
            debug!(project = %project.name, search = %source.search, "Searching for repos");
        } else {
            info!(project = %project.name, provider = %kind, search = %source.search, "Fetching repos");
        }

        let provider = self.providers.create(kind)?;
        provider
            .load_repos(&source.search, self.git.as_ref(), project)
            .await?;

        if project.repo_count() == 0 {
            return Err(Error::NotFound(format!(
                "repositories for project {:?}",
                project.name
            )));
        }

        if let Some(cache) = cache {
            if let Err(e) = cache.save(&key, project) {
                warn!(key = %key, error = %e, "Failed to save cache");
            }
        }
        Ok(())
    }

    /// Assign the repository's local path and state
    async fn compute_state(
        &self,
        repo: &mut Repository,
        base: Option<&Path>,
        kind: Option<SourceKind>,
    ) {
        repo.kind = kind;
        repo.abs_path = None;
        repo.mark(RepoState::Unknown, "");

        let path = match repo_path(repo, base) {
            Ok(Some(path)) => path,
            Ok(None) => {
                match kind {
                    Some(k) if k != SourceKind::Filesystem => repo.mark(RepoState::Remote, ""),
                    _ => repo.mark(RepoState::Error, "no local directory declared"),
                }
                return;
            }
            Err(e) => {
                repo.mark(RepoState::Error, e.to_string());
                return;
            }
        };

        repo.abs_path = Some(path.clone());
        if !path.exists() {
            repo.mark(RepoState::NoLocal, "");
            return;
        }
        if !self.git.is_repo(&path) {
            repo.mark(RepoState::Error, "not a git repository");
            return;
        }
        if repo.src.is_empty() {
            match self.git.remote(&path).await {
                Ok(src) => repo.src = src,
                Err(e) => debug!(path = %path.display(), error = %e, "No remote"),
            }
        }
        repo.mark(RepoState::Ok, "");
    }
}

/// Pick the declared projects matching `names`
fn select(
    names: &[String],
    projects: &BTreeMap<String, Project>,
) -> (Vec<(String, Project)>, Vec<ProjectFailure>) {
    if let Some(first) = names.first() {
        if Project::is_path_like(first) {
            let project = Project::from_path(first.as_str());
            return (vec![(project.name.clone(), project)], Vec::new());
        }
    }

    let mut failures = Vec::new();
    for name in names {
        if !projects.contains_key(name) {
            failures.push(ProjectFailure {
                name: name.clone(),
                error: Error::NotFound(format!("project {:?}", name)),
            });
        }
    }

    let selected = projects
        .iter()
        .filter(|(name, _)| names.is_empty() || names.contains(name))
        .map(|(name, project)| {
            let mut project = project.clone();
            if project.name.is_empty() {
                project.name = name.clone();
            }
            (name.clone(), project)
        })
        .collect();
    (selected, failures)
}

/// Every declared project in the tree that names its own source
fn sourced_projects(project: &Project) -> Vec<&Project> {
    let mut found = Vec::new();
    if key_for(project).is_some() {
        found.push(project);
    }
    for sub in &project.sub_projects {
        found.extend(sourced_projects(sub));
    }
    found
}

/// A filesystem source without a search key walks the project's own directory
///
/// The resolved base is used when known so the walker never joins a relative
/// path onto it a second time.
fn default_filesystem_search(project: &mut Project) {
    let search = match project.abs_path.as_ref() {
        Some(abs) => abs.to_string_lossy().to_string(),
        None => project.path.clone(),
    };
    if let Some(source) = project.source.as_mut() {
        if source.search.is_empty() && source.kind == SourceKind::Filesystem.as_str() {
            source.search = search;
        }
    }
}

/// Base directory of a project: its own path relative to the parent's, or
/// `<parent>/<name>` when it declares none
fn project_base(project: &Project, parent: Option<&Path>) -> Result<Option<PathBuf>> {
    if project.path.is_empty() {
        return Ok(parent.map(|p| p.join(&project.name)));
    }
    let path = expand_home(&project.path);
    if path.is_absolute() {
        return Ok(Some(path));
    }
    match parent {
        Some(parent) => Ok(Some(parent.join(path))),
        None => Ok(Some(std::env::current_dir()?.join(path))),
    }
}

/// Local path of a repository, `None` when nothing places it on disk
fn repo_path(repo: &Repository, base: Option<&Path>) -> Result<Option<PathBuf>> {
    if !repo.dir.is_empty() {
        let dir = expand_home(&repo.dir);
        if dir.is_absolute() {
            return Ok(Some(dir));
        }
        return match base {
            Some(base) => Ok(Some(base.join(dir))),
            None => Ok(Some(std::env::current_dir()?.join(dir))),
        };
    }

    let Some(base) = base else {
        return Ok(None);
    };
    let name = dir_name_from_source(&repo.src).ok_or_else(|| {
        Error::Config(format!(
            "cannot derive a directory for {} from its source",
            repo.display_name()
        ))
    })?;
    Ok(Some(base.join(name)))
}
