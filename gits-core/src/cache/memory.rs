//! In-process cache

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{key_for, CacheRecord, CacheStore};
use crate::config::DEFAULT_CACHE_TTL;
use crate::model::Project;
use crate::{Error, Result};

/// Keeps records in memory for the lifetime of the value
#[derive(Debug)]
pub struct MemoryCache {
    records: Mutex<HashMap<String, CacheRecord>>,
    checksum: String,
    ttl: Duration,
}

impl MemoryCache {
    /// Empty cache validating against `checksum`
    pub fn new(checksum: impl Into<String>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            checksum: checksum.into(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override the record lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record exists for `key`, valid or not
    pub fn contains(&self, key: &str) -> bool {
        self.records
            .lock()
            .map(|r| r.contains_key(key))
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheRecord>>> {
        self.records
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".to_string()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str, project: &mut Project) -> Result<bool> {
        let record = match self.lock() {
            Ok(records) => records.get(key).cloned(),
            Err(_) => return Ok(false),
        };
        match record {
            Some(record) if record.rejection(&self.checksum, self.ttl, project).is_none() => {
                record.restore_into(project);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn save(&self, key: &str, project: &Project) -> Result<()> {
        let record = CacheRecord::new(self.checksum.clone(), project.clone());
        self.lock()?.insert(key.to_string(), record);
        Ok(())
    }

    fn flush(&self, project: &Project) -> Result<()> {
        if let Some(key) = key_for(project) {
            self.lock()?.remove(&key);
        }
        Ok(())
    }
}
