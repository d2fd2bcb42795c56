//! CLI command implementations

pub mod bulk;
pub mod list;
pub mod orphan;
pub mod sync;

use std::sync::Arc;

use gits_core::{Config, Executor, FileCache, GitCli, Project, Resolver};
use gits_providers::Providers;

pub use bulk::{BulkArgs, CheckoutArgs};
pub use list::ListArgs;
pub use orphan::OrphanArgs;
pub use sync::SyncArgs;

/// Loaded configuration shared by every command
pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Resolver wired to the git binary, hosted providers and the file cache
    pub fn resolver(&self) -> anyhow::Result<Resolver> {
        let settings = &self.config.settings;
        let git = GitCli::new()
            .with_path(settings.git_path.as_str())
            .with_timeout(settings.git_timeout);
        let providers = Providers::lazy();

        let mut resolver = Resolver::new(Arc::new(git), Arc::new(providers));
        if settings.cache {
            let cache = FileCache::new(self.config.checksum(), settings.cache_ttl)?;
            resolver = resolver.with_cache(Arc::new(cache));
        }
        Ok(resolver)
    }

    pub fn executor(&self, resolver: &Resolver) -> Executor {
        Executor::new(resolver.git(), self.config.settings.worker_count)
    }

    /// Resolve a single project by name or directory
    pub async fn resolve_one(&self, resolver: &Resolver, name: &str) -> anyhow::Result<Project> {
        let resolution = resolver
            .resolve(&[name.to_string()], &self.config.projects)
            .await;
        Ok(resolution.into_single()?)
    }
}

/// Print the effective configuration
pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let config = &ctx.config;
    let settings = &config.settings;

    println!("gits Configuration");
    println!("==================");
    println!();
    println!("Settings:");
    println!("  cache: {}", settings.cache);
    println!("  cache_ttl: {:?}", settings.cache_ttl);
    println!("  worker_count: {}", settings.worker_count);
    println!("  git_path: {}", settings.git_path);
    match settings.git_timeout {
        Some(timeout) => println!("  git_timeout: {:?}", timeout),
        None => println!("  git_timeout: (none)"),
    }
    println!();

    println!("Projects:");
    if config.projects.is_empty() {
        println!("  (none)");
    }
    for (name, project) in &config.projects {
        println!("  {}: {}", name, project.source_label());
    }
    println!();

    match &config.source.path {
        Some(path) => println!("Config file: {}", path.display()),
        None => {
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                println!("  (not found - using defaults)");
            }
        }
    }
    if settings.cache {
        if let Some(dir) = FileCache::default_dir() {
            println!("Cache dir: {}", dir.display());
        }
    }
    Ok(())
}
