//! gits core - project resolution and bulk git operations
//!
//! This crate turns declared projects (local directories, hosted provider
//! accounts and groups, or static repository lists) into resolved trees of
//! repositories with on-disk state, caches provider results, and runs git
//! operations across those trees with bounded concurrency.

pub mod bulk;
pub mod cache;
pub mod config;
pub mod error;
pub mod git;
pub mod model;
pub mod orphan;
pub mod providers;
pub mod resolve;
pub mod secrets;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{BulkFailure, BulkReport, Executor, Operation, RepoOutcome};
pub use cache::{CacheRecord, CacheStore, FileCache, MemoryCache};
pub use config::{Config, ConfigSource, Settings};
pub use error::{Error, Result};
pub use git::{GitCapability, GitCli, RepoStatus};
pub use model::{Project, ProviderSource, RepoState, Repository, Selection, SourceKind};
pub use orphan::find_orphans;
pub use providers::{FilesystemProvider, ProviderFactory, RepoProvider};
pub use resolve::{ProjectFailure, Resolution, Resolver};
pub use secrets::Secrets;
