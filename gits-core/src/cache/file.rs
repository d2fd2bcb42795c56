//! File-backed cache, one JSON document per key

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::{key_for, CacheRecord, CacheStore};
use crate::config::DEFAULT_CACHE_TTL;
use crate::model::Project;
use crate::{Error, Result};

/// Stores records at `<cache dir>/gits/<key>.json`
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    checksum: String,
    ttl: Duration,
}

impl FileCache {
    /// Cache under the platform cache directory (`$XDG_CACHE_HOME/gits` on Linux)
    pub fn new(checksum: impl Into<String>, ttl: Duration) -> Result<Self> {
        let dir = Self::default_dir()
            .ok_or_else(|| Error::Cache("Could not determine cache directory".to_string()))?;
        Ok(Self::with_dir(dir, checksum, ttl))
    }

    /// Cache rooted at an explicit directory
    pub fn with_dir(dir: impl Into<PathBuf>, checksum: impl Into<String>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            checksum: checksum.into(),
            ttl,
        }
    }

    /// Cache with the default TTL
    pub fn with_default_ttl(checksum: impl Into<String>) -> Result<Self> {
        Self::new(checksum, DEFAULT_CACHE_TTL)
    }

    /// Get the default cache directory
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("gits"))
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str, project: &mut Project) -> Result<bool> {
        let path = self.path(key);
        let contents = match fs::read(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(key, error = %e, "Cache miss");
                return Ok(false);
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&contents) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache file");
                return Ok(false);
            }
        };

        if let Some(reason) = record.rejection(&self.checksum, self.ttl, project) {
            debug!(key, reason = %reason, "Cache stale");
            return Ok(false);
        }

        debug!(key, "Cache hit");
        record.restore_into(project);
        Ok(true)
    }

    fn save(&self, key: &str, project: &Project) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Cache(format!(
                "Failed to create cache dir {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let record = CacheRecord::new(self.checksum.clone(), project.clone());
        let contents = serde_json::to_vec_pretty(&record)?;
        let path = self.path(key);
        fs::write(&path, contents)
            .map_err(|e| Error::Cache(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(key, path = %path.display(), "Cache saved");
        Ok(())
    }

    fn flush(&self, project: &Project) -> Result<()> {
        let Some(key) = key_for(project) else {
            return Ok(());
        };
        let path = self.path(&key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %key, "Cache flushed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProviderSource, Repository, SourceKind};
    use tempfile::TempDir;

    fn sample() -> Project {
        Project {
            name: "work".to_string(),
            source: Some(ProviderSource::new(SourceKind::GitHub, "acme")),
            repos: vec![
                Repository {
                    name: "api".to_string(),
                    src: "git@github.com:acme/api.git".to_string(),
                    ..Default::default()
                },
                Repository {
                    name: "web".to_string(),
                    src: "git@github.com:acme/web.git".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::with_dir(temp.path(), "sum", DEFAULT_CACHE_TTL);
        let project = sample();

        cache.save("github-acme", &project).unwrap();

        let mut loaded = Project::default();
        assert!(cache.get("github-acme", &mut loaded).unwrap());
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_save_creates_missing_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("gits");
        let cache = FileCache::with_dir(&dir, "sum", DEFAULT_CACHE_TTL);

        cache.save("k", &sample()).unwrap();
        assert!(dir.join("k.json").exists());
    }

    #[test]
    fn test_checksum_change_is_miss() {
        let temp = TempDir::new().unwrap();
        FileCache::with_dir(temp.path(), "before", DEFAULT_CACHE_TTL)
            .save("k", &sample())
            .unwrap();

        let cache = FileCache::with_dir(temp.path(), "after", DEFAULT_CACHE_TTL);
        let mut loaded = Project::default();
        assert!(!cache.get("k", &mut loaded).unwrap());
        assert_eq!(loaded, Project::default());
    }

    #[test]
    fn test_expired_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::with_dir(temp.path(), "sum", Duration::ZERO);
        cache.save("k", &sample()).unwrap();

        let mut loaded = Project::default();
        assert!(!cache.get("k", &mut loaded).unwrap());
    }

    #[test]
    fn test_corrupt_file_is_miss() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("k.json"), b"{not json").unwrap();

        let cache = FileCache::with_dir(temp.path(), "sum", DEFAULT_CACHE_TTL);
        let mut loaded = Project::default();
        assert!(!cache.get("k", &mut loaded).unwrap());
    }

    #[test]
    fn test_missing_file_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::with_dir(temp.path(), "sum", DEFAULT_CACHE_TTL);
        let mut loaded = Project::default();
        assert!(!cache.get("absent", &mut loaded).unwrap());
    }

    #[test]
    fn test_flush() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::with_dir(temp.path(), "sum", DEFAULT_CACHE_TTL);
        let project = sample();
        let key = key_for(&project).unwrap();
        cache.save(&key, &project).unwrap();

        cache.flush(&project).unwrap();
        assert!(!temp.path().join(format!("{}.json", key)).exists());

        // Flushing again is fine
        cache.flush(&project).unwrap();
        // So is flushing a project without a source
        cache.flush(&Project::default()).unwrap();
    }

    #[test]
    fn test_record_layout() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::with_dir(temp.path(), "sum", DEFAULT_CACHE_TTL);
        cache.save("k", &sample()).unwrap();

        let raw = fs::read_to_string(temp.path().join("k.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["version"].is_string());
        assert!(value["timestamp"].is_string());
        assert_eq!(value["checksum"], "sum");
        assert_eq!(value["project"]["name"], "work");
        assert!(value["project"]["repos"][0].get("state").is_none());
    }
}
