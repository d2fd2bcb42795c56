//! Configuration management for gits
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GITS_*)
//! 3. Config file (~/.config/gits/config.toml)
//! 4. Default values
//!
//! The raw bytes of the config file are kept alongside the parsed values; their
//! checksum invalidates cached provider results whenever the file is edited.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Project;
use crate::{Error, Result};

/// Default number of concurrent git operations per project level
pub const DEFAULT_WORKERS: usize = 10;

/// Default lifetime of a cache record
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Whether provider results are cached on disk
    pub cache: bool,

    /// Maximum git operations in flight at once
    pub worker_count: usize,

    /// How long a cache record stays valid
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Path to the git executable
    pub git_path: String,

    /// Deadline for every git subprocess
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub git_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: true,
            worker_count: DEFAULT_WORKERS,
            cache_ttl: DEFAULT_CACHE_TTL,
            git_path: "git".to_string(),
            git_timeout: None,
        }
    }
}

/// Where the configuration came from, kept for cache invalidation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// File the configuration was read from, if any
    pub path: Option<PathBuf>,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl ConfigSource {
    /// SHA-256 of the raw configuration bytes, hex encoded
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Global settings
    pub settings: Settings,

    /// Declared projects by name
    pub projects: BTreeMap<String, Project>,

    /// Raw input
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::parse(&bytes)?;
        config.source.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from raw TOML bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let contents = std::str::from_utf8(bytes)
            .map_err(|e| Error::Config(format!("Config is not valid UTF-8: {}", e)))?;
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        for (key, project) in config.projects.iter_mut() {
            if project.name.is_empty() {
                project.name = key.clone();
            }
        }
        config.source = ConfigSource {
            path: None,
            bytes: bytes.to_vec(),
        };
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/gits/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gits").join("config.toml"))
    }

    /// Checksum of the raw input, used to validate cache records
    pub fn checksum(&self) -> String {
        self.source.checksum()
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GITS_WORKERS: Concurrent git operations
    /// - GITS_NO_CACHE: Disable the provider cache when set to a truthy value
    /// - GITS_GIT_PATH: Path to git executable
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(workers) = std::env::var("GITS_WORKERS")
            .ok()
            .and_then(|w| w.trim().parse().ok())
        {
            self.settings.worker_count = workers;
        }

        if let Ok(no_cache) = std::env::var("GITS_NO_CACHE") {
            if is_truthy(&no_cache) {
                self.settings.cache = false;
            }
        }

        if let Ok(git_path) = std::env::var("GITS_GIT_PATH") {
            if !git_path.is_empty() {
                self.settings.git_path = git_path;
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, workers: Option<usize>, no_cache: bool) -> Self {
        if let Some(w) = workers {
            self.settings.worker_count = w;
        }

        if no_cache {
            self.settings.cache = false;
        }

        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.settings.worker_count == 0 {
            return Err(Error::Config("worker_count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        path: Option<&Path>,
        workers: Option<usize>,
        no_cache: bool,
    ) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::load()?,
        }
        .with_env_overrides()
        .with_cli_overrides(workers, no_cache);

        config.validate()?;
        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.cache);
        assert_eq!(config.settings.worker_count, DEFAULT_WORKERS);
        assert_eq!(config.settings.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.settings.git_path, "git");
        assert!(config.projects.is_empty());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(Some(3), true);
        assert_eq!(config.settings.worker_count, 3);
        assert!(!config.settings.cache);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[settings]
worker_count = 4
cache_ttl = "24h"
git_timeout = "2m"

[projects.work]
path = "~/code/work"
desc = "Work repositories"
source = { type = "github", search = "acme" }
exclude = ["legacy"]

[projects.dotfiles]
repos = [
    { dir = "~/.config/nvim", src = "git@github.com:me/nvim.git" },
    { dir = "~/.dotfiles" },
]
"#;
        let config = Config::parse(toml.as_bytes()).unwrap();
        assert_eq!(config.settings.worker_count, 4);
        assert_eq!(config.settings.cache_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.settings.git_timeout, Some(Duration::from_secs(120)));

        let work = &config.projects["work"];
        assert_eq!(work.name, "work");
        assert_eq!(work.source.as_ref().unwrap().search, "acme");
        assert_eq!(work.exclude, vec!["legacy".to_string()]);

        let dotfiles = &config.projects["dotfiles"];
        assert_eq!(dotfiles.repos.len(), 2);
        assert_eq!(dotfiles.repos[0].src, "git@github.com:me/nvim.git");
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[settings]
cache = false
"#;
        let config = Config::parse(toml.as_bytes()).unwrap();
        assert!(!config.settings.cache);
        // worker_count should use default
        assert_eq!(config.settings.worker_count, DEFAULT_WORKERS);
    }

    #[test]
    fn test_checksum_follows_raw_bytes() {
        let a = Config::parse(b"[projects.a]\npath = \"/tmp\"\n").unwrap();
        let b = Config::parse(b"[projects.a]\npath = \"/tmp\" \n").unwrap();
        assert_eq!(a.checksum(), a.clone().checksum());
        assert_ne!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 64);
    }

    #[test]
    fn test_load_from_file_records_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[projects.x]\npath = \"/srv\"").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.source.path.as_deref(), Some(file.path()));
        assert_eq!(config.projects["x"].path, "/srv");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::parse(b"[projects.x\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = Config::default().with_cli_overrides(Some(0), false);
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel"), PathBuf::from("rel"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/code"), home.join("code"));
        }
    }
}
