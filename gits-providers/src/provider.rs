//! The closed set of repository sources

use std::sync::OnceLock;

use async_trait::async_trait;
use gits_core::{
    FilesystemProvider, GitCapability, Project, ProviderFactory, RepoProvider, Secrets,
    SourceKind,
};
use tracing::debug;

use crate::{BitbucketProvider, GitHubProvider, GitLabProvider, Result};

/// One provider per source kind
pub enum Provider {
    /// Local directory walk
    Filesystem(FilesystemProvider),
    /// GitHub owner search
    GitHub(GitHubProvider),
    /// GitLab group tree
    GitLab(GitLabProvider),
    /// Bitbucket workspace
    Bitbucket(BitbucketProvider),
}

impl Provider {
    /// Build the provider for `kind` with credentials from `secrets`
    pub fn for_kind(kind: SourceKind, secrets: &Secrets) -> Result<Self> {
        debug!(kind = kind.as_str(), "Creating provider");
        Ok(match kind {
            SourceKind::Filesystem => Provider::Filesystem(FilesystemProvider::new()),
            SourceKind::GitHub => Provider::GitHub(GitHubProvider::new(secrets.github_token())?),
            SourceKind::GitLab => Provider::GitLab(GitLabProvider::new(secrets.gitlab_token())?),
            SourceKind::Bitbucket => {
                Provider::Bitbucket(BitbucketProvider::new(secrets.bitbucket_token())?)
            }
        })
    }

    /// Source kind served by this provider
    pub fn kind(&self) -> SourceKind {
        match self {
            Provider::Filesystem(_) => SourceKind::Filesystem,
            Provider::GitHub(_) => SourceKind::GitHub,
            Provider::GitLab(_) => SourceKind::GitLab,
            Provider::Bitbucket(_) => SourceKind::Bitbucket,
        }
    }

    fn inner(&self) -> &dyn RepoProvider {
        match self {
            Provider::Filesystem(p) => p,
            Provider::GitHub(p) => p,
            Provider::GitLab(p) => p,
            Provider::Bitbucket(p) => p,
        }
    }
}

#[async_trait]
impl RepoProvider for Provider {
    async fn load_repos(
        &self,
        search: &str,
        git: &dyn GitCapability,
        project: &mut Project,
    ) -> gits_core::Result<()> {
        self.inner().load_repos(search, git, project).await
    }
}

/// Provider factory backed by configured secrets
///
/// Secrets are read the first time a hosted provider is requested, so
/// filesystem-only runs never touch the secrets file.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    secrets: OnceLock<Secrets>,
}

impl Providers {
    /// Factory using `secrets` for hosted providers
    pub fn new(secrets: Secrets) -> Self {
        Self {
            secrets: OnceLock::from(secrets),
        }
    }

    /// Factory that loads secrets from the environment and the default
    /// secrets file on first use
    pub fn lazy() -> Self {
        Self::default()
    }

    fn secrets(&self) -> gits_core::Result<&Secrets> {
        if let Some(secrets) = self.secrets.get() {
            return Ok(secrets);
        }
        let loaded = Secrets::load()?;
        Ok(self.secrets.get_or_init(|| loaded))
    }
}

impl ProviderFactory for Providers {
    fn create(&self, kind: SourceKind) -> gits_core::Result<Box<dyn RepoProvider>> {
        if kind == SourceKind::Filesystem {
            return Ok(Box::new(Provider::Filesystem(FilesystemProvider::new())));
        }
        Ok(Box::new(Provider::for_kind(kind, self.secrets()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_needs_no_credentials() {
        let provider = Provider::for_kind(SourceKind::Filesystem, &Secrets::default()).unwrap();
        assert_eq!(provider.kind(), SourceKind::Filesystem);
    }

    #[test]
    fn test_bitbucket_rejects_malformed_token() {
        let mut secrets = Secrets::default();
        secrets.bitbucket.token = Some("just-a-token".to_string());
        assert!(matches!(
            Provider::for_kind(SourceKind::Bitbucket, &secrets),
            Err(crate::Error::Auth { .. })
        ));
    }

    #[test]
    fn test_filesystem_skips_secrets() {
        let factory = Providers::lazy();
        assert!(factory.create(SourceKind::Filesystem).is_ok());
        assert!(factory.secrets.get().is_none());
    }

    #[test]
    fn test_factory_maps_errors_to_provider() {
        let mut secrets = Secrets::default();
        secrets.bitbucket.token = Some("nocolon".to_string());
        let factory = Providers::new(secrets);
        let err = factory.create(SourceKind::Bitbucket).err().unwrap();
        assert!(matches!(err, gits_core::Error::Provider(_)));
    }
}
