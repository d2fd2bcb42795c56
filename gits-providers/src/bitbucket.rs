//! Bitbucket Cloud workspace listing

use async_trait::async_trait;
use gits_core::{GitCapability, Project, RepoProvider, Repository};
use serde::Deserialize;
use tracing::info;

use crate::{http, Error, Result};

/// Bitbucket Cloud API
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    values: Vec<BitbucketRepo>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    uuid: String,
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    owner: Option<Owner>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Owner {
    uuid: String,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    clone: Vec<CloneLink>,
}

#[derive(Debug, Deserialize)]
struct CloneLink {
    name: String,
    href: String,
}

/// Lists a workspace's repositories
pub struct BitbucketProvider {
    http: reqwest::Client,
    api_url: String,
    user: String,
    password: String,
}

impl BitbucketProvider {
    /// Create a provider from `user:app-password` credentials
    pub fn new(token: Option<String>) -> Result<Self> {
        let token = token.ok_or_else(|| {
            Error::auth(
                "bitbucket",
                "token not found. Set BITBUCKET_TOKEN to user:app-password \
                 or add token to ~/.config/gits/secrets.toml",
            )
        })?;
        let (user, password) = split_credentials(&token)?;
        Ok(Self {
            http: http::client()?,
            api_url: DEFAULT_API_URL.to_string(),
            user,
            password,
        })
    }

    /// All repositories of `owner`, plus the owner id
    pub async fn fetch_repos(&self, owner: &str) -> Result<(Vec<Repository>, String)> {
        let mut url = format!("{}/repositories/{}?pagelen=100", self.api_url, owner);
        let mut owner_id = String::new();
        let mut repos = Vec::new();
        let mut page = 0;

        loop {
            page += 1;
            info!(owner, page, "Fetching Bitbucket repositories");

            let response = self
                .http
                .get(&url)
                .basic_auth(&self.user, Some(&self.password))
                .header("Accept", "application/json")
                .send()
                .await?;
            let body: Page = http::json("bitbucket", response).await?;

            if owner_id.is_empty() {
                owner_id = body
                    .values
                    .iter()
                    .find_map(|r| r.owner.as_ref().map(|o| o.uuid.clone()))
                    .unwrap_or_default();
            }
            repos.extend(body.values.into_iter().filter_map(|r| map_repo(owner, r)));

            match body.next {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        if owner_id.is_empty() {
            owner_id = owner.to_string();
        }
        Ok((repos, owner_id))
    }
}

#[async_trait]
impl RepoProvider for BitbucketProvider {
    async fn load_repos(
        &self,
        search: &str,
        _git: &dyn GitCapability,
        project: &mut Project,
    ) -> gits_core::Result<()> {
        let (repos, owner_id) = self.fetch_repos(search).await?;
        if repos.is_empty() {
            return Err(Error::Empty(format!("bitbucket owner {}", search)).into());
        }
        project.id = owner_id;
        project.repos = repos;
        Ok(())
    }
}

fn split_credentials(token: &str) -> Result<(String, String)> {
    match token.split_once(':') {
        Some((user, password)) if !user.is_empty() && !password.is_empty() => {
            Ok((user.to_string(), password.to_string()))
        }
        _ => Err(Error::auth(
            "bitbucket",
            "token is invalid, expected user:app-password",
        )),
    }
}

fn map_repo(owner: &str, repo: BitbucketRepo) -> Option<Repository> {
    if repo.size == Some(0) {
        return None;
    }
    let mut mapped = Repository {
        id: repo.uuid,
        name: repo.slug,
        namespace: owner.to_string(),
        desc: repo.description,
        ..Default::default()
    };
    for link in repo.links.clone {
        match link.name.as_str() {
            "ssh" => mapped.src = link.href,
            "https" => mapped.url = link.href,
            _ => {}
        }
    }
    Some(mapped)
}
