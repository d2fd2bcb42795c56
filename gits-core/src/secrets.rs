//! Provider tokens
//!
//! Tokens are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/gits/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GITHUB_TOKEN, GITLAB_TOKEN, BITBUCKET_TOKEN)
//! 2. Secrets file (~/.config/gits/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub token
    pub github: TokenSecret,
    /// GitLab token
    pub gitlab: TokenSecret,
    /// Bitbucket `user:app-password`
    pub bitbucket: TokenSecret,
}

/// A single provider credential
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSecret {
    /// Access token
    pub token: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        let secrets_path = Self::default_secrets_path();

        if let Some(path) = secrets_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            // Readable by group or others
            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for secret in [
            &mut secrets.github,
            &mut secrets.gitlab,
            &mut secrets.bitbucket,
        ] {
            if let Some(ref mut token) = secret.token {
                *token = token.trim().to_string();
            }
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/gits/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gits").join("secrets.toml"))
    }

    /// GitHub token
    ///
    /// Priority: GITHUB_TOKEN > HOMEBREW_GITHUB_API_TOKEN > secrets file
    pub fn github_token(&self) -> Option<String> {
        resolve(
            &["GITHUB_TOKEN", "HOMEBREW_GITHUB_API_TOKEN"],
            &self.github,
            "github",
        )
    }

    /// GitLab token
    ///
    /// Priority: GITLAB_TOKEN > secrets file
    pub fn gitlab_token(&self) -> Option<String> {
        resolve(&["GITLAB_TOKEN"], &self.gitlab, "gitlab")
    }

    /// Bitbucket credentials as `user:app-password`
    ///
    /// Priority: BITBUCKET_TOKEN > secrets file
    pub fn bitbucket_token(&self) -> Option<String> {
        resolve(&["BITBUCKET_TOKEN"], &self.bitbucket, "bitbucket")
    }
}

fn resolve(vars: &[&str], file: &TokenSecret, provider: &str) -> Option<String> {
    for var in vars {
        if let Ok(token) = std::env::var(var) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                debug!(provider, var, "Using token from environment variable");
                return Some(token);
            }
        }
    }

    match file.token {
        Some(ref token) if !token.is_empty() => {
            debug!(provider, "Using token from secrets file");
            Some(token.clone())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.github.token.is_none());
        assert!(secrets.gitlab.token.is_none());
        assert!(secrets.bitbucket.token.is_none());
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[github]
token = "ghp_xxxxxxxxxxxx"

[bitbucket]
token = "me:app-password"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.github.token, Some("ghp_xxxxxxxxxxxx".to_string()));
        assert!(secrets.gitlab.token.is_none());
        assert_eq!(secrets.bitbucket.token, Some("me:app-password".to_string()));
    }

    #[test]
    fn test_file_token_used_without_env() {
        let file = TokenSecret {
            token: Some("from_file".to_string()),
        };
        assert_eq!(
            resolve(&["GITS_TEST_UNSET_TOKEN_VAR"], &file, "test"),
            Some("from_file".to_string())
        );

        let empty = TokenSecret {
            token: Some(String::new()),
        };
        assert_eq!(resolve(&["GITS_TEST_UNSET_TOKEN_VAR"], &empty, "test"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gitlab]\ntoken = \"test\"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o644);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let result = Secrets::load_from_file(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted_and_trimmed() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gitlab]\ntoken = \"  glpat-test  \"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.gitlab.token, Some("glpat-test".to_string()));
    }
}
