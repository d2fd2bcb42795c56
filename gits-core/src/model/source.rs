//! Provider source descriptors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const README_URL: &str = "https://github.com/rafi/gits#config";

/// The closed set of places repositories can be discovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local directory walk
    Filesystem,
    /// GitHub owner (user or organization)
    GitHub,
    /// GitLab group, including sub-groups
    GitLab,
    /// Bitbucket workspace/owner
    Bitbucket,
}

impl SourceKind {
    /// Name used in configuration files and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Filesystem => "filesystem",
            SourceKind::GitHub => "github",
            SourceKind::GitLab => "gitlab",
            SourceKind::Bitbucket => "bitbucket",
        }
    }

    /// Name of the search key as users know it, for error messages
    fn search_field(&self) -> &'static str {
        match self {
            SourceKind::Filesystem => "path",
            SourceKind::GitHub | SourceKind::Bitbucket => "owner",
            SourceKind::GitLab => "groupID",
        }
    }

    /// Whether results for this kind may be cached
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, SourceKind::Filesystem)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "filesystem" => Ok(SourceKind::Filesystem),
            "github" => Ok(SourceKind::GitHub),
            "gitlab" => Ok(SourceKind::GitLab),
            "bitbucket" => Ok(SourceKind::Bitbucket),
            other => Err(Error::Config(format!(
                "unknown source type: {}. see {}",
                other, README_URL
            ))),
        }
    }
}

/// Where a project's repositories come from
///
/// The type is kept as a raw string so that a typo in one project is reported
/// against that project instead of failing the whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSource {
    /// Provider type (`filesystem`, `github`, `gitlab`, `bitbucket`)
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Provider-specific search key: owner login, group id or directory
    #[serde(default)]
    pub search: String,
}

impl ProviderSource {
    /// Create a source of the given kind
    pub fn new(kind: SourceKind, search: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            search: search.into(),
        }
    }

    /// Whether no provider type was declared
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    /// Parse the declared type without checking the search key
    pub fn source_kind(&self) -> Result<SourceKind> {
        self.kind.parse()
    }

    /// Check the source is usable and return its kind
    pub fn validate(&self) -> Result<SourceKind> {
        let kind = self.source_kind()?;
        if self.search.trim().is_empty() {
            return Err(Error::Config(format!(
                "for {} provider, make sure you included the correct {:?} value \
                 in your config file under the `search` key. see {}",
                kind,
                kind.search_field(),
                README_URL
            )));
        }
        Ok(kind)
    }

    /// Deterministic, filesystem-safe cache key for this source
    pub fn cache_key(&self) -> String {
        let search = self.search.replace(['/', '\\'], "%");
        format!("{}-{}", self.kind, search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("github".parse::<SourceKind>().unwrap(), SourceKind::GitHub);
        assert_eq!("gitlab".parse::<SourceKind>().unwrap(), SourceKind::GitLab);
        assert_eq!(
            "filesystem".parse::<SourceKind>().unwrap(),
            SourceKind::Filesystem
        );
        assert!("gitea".parse::<SourceKind>().unwrap_err().is_config());
    }

    #[test]
    fn test_validate_requires_search_key() {
        let source = ProviderSource::new(SourceKind::GitHub, "");
        let err = source.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("owner"));

        let source = ProviderSource::new(SourceKind::GitLab, "1234");
        assert_eq!(source.validate().unwrap(), SourceKind::GitLab);
    }

    #[test]
    fn test_cache_key_is_filesystem_safe() {
        let source = ProviderSource::new(SourceKind::Filesystem, "/home/me/code");
        assert_eq!(source.cache_key(), "filesystem-%home%me%code");

        let source = ProviderSource::new(SourceKind::GitLab, "group/sub");
        assert_eq!(source.cache_key(), "gitlab-group%sub");
        assert!(!source.cache_key().contains('/'));
    }

    #[test]
    fn test_parse_toml_source() {
        let source: ProviderSource = toml::from_str("type = \"bitbucket\"\nsearch = \"team\"").unwrap();
        assert_eq!(source.validate().unwrap(), SourceKind::Bitbucket);
        assert_eq!(source.search, "team");
    }
}
