//! Cached provider results
//!
//! Hosted providers are slow and rate limited, so the resolved repository list of
//! a project is stored under a key derived from its source. A record is only used
//! when the tool version, the config checksum, the declaration hash and the TTL
//! all agree; anything else is a miss and the provider is asked again.

mod file;
mod memory;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Project;
use crate::Result;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Storage for resolved projects keyed by source
pub trait CacheStore: Send + Sync {
    /// Populate `project` from a valid record; `Ok(false)` on any kind of miss
    fn get(&self, key: &str, project: &mut Project) -> Result<bool>;

    /// Store `project` under `key`, overwriting any previous record
    fn save(&self, key: &str, project: &Project) -> Result<()>;

    /// Remove the record for the project's source, if there is one
    fn flush(&self, project: &Project) -> Result<()>;
}

/// One persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// `major.minor` of the tool that wrote the record
    pub version: String,
    /// When the record was written
    pub timestamp: DateTime<Utc>,
    /// Checksum of the config input at write time
    pub checksum: String,
    /// The resolved project
    pub project: Project,
}

impl CacheRecord {
    /// A record written now by this build
    pub fn new(checksum: impl Into<String>, project: Project) -> Self {
        Self {
            version: record_version(),
            timestamp: Utc::now(),
            checksum: checksum.into(),
            project,
        }
    }

    /// Why this record cannot be used, or `None` when it is valid
    pub fn rejection(&self, checksum: &str, ttl: Duration, declared: &Project) -> Option<String> {
        if self.version != record_version() {
            return Some(format!(
                "version {} != {}",
                self.version,
                record_version()
            ));
        }
        if self.checksum != checksum {
            return Some("config checksum changed".to_string());
        }
        if !declared.content_hash.is_empty() && self.project.content_hash != declared.content_hash
        {
            return Some("project declaration changed".to_string());
        }
        let age = Utc::now().signed_duration_since(self.timestamp);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) if age >= ttl => Some(format!("expired {}s ago", (age - ttl).num_seconds())),
            Ok(_) => None,
            Err(_) => None,
        }
    }

    /// Copy the cached result into `project`, keeping its resolved base path
    pub fn restore_into(self, project: &mut Project) {
        let abs_path = project.abs_path.take();
        *project = self.project;
        project.abs_path = abs_path;
    }
}

/// `major.minor` of this crate
pub fn record_version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{}.{}", major, minor),
        _ => version.to_string(),
    }
}

/// Cache key for a project, or `None` when it has no source
pub fn key_for(project: &Project) -> Option<String> {
    project
        .source
        .as_ref()
        .filter(|s| !s.is_empty())
        .map(|s| s.cache_key())
}
