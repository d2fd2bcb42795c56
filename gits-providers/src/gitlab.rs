//! GitLab group listing through the REST API
//!
//! A group becomes a project; its sub-groups become sub-projects, loaded
//! recursively, and its GitLab projects become repositories.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use gits_core::{GitCapability, Project, RepoProvider, Repository};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{http, Result};

/// Public GitLab API
pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct Group {
    id: u64,
    name: String,
    path: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupProject {
    id: u64,
    path: String,
    #[serde(default)]
    description: Option<String>,
    namespace: Namespace,
    #[serde(default)]
    ssh_url_to_repo: String,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    empty_repo: bool,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    full_path: String,
}

/// Lists a group's projects and sub-groups
pub struct GitLabProvider {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitLabProvider {
    /// Create a provider for gitlab.com
    pub fn new(token: Option<String>) -> Result<Self> {
        let token = token.ok_or_else(|| {
            crate::Error::auth(
                "gitlab",
                "token not found. Set GITLAB_TOKEN environment variable \
                 or add token to ~/.config/gits/secrets.toml",
            )
        })?;
        Ok(Self {
            http: http::client()?,
            api_url: DEFAULT_API_URL.to_string(),
            token,
        })
    }

    /// Point at a self-hosted instance (`https://host/api/v4`)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Populate `project` from group `group_id`, recursing into sub-groups
    fn load_group<'a>(
        &'a self,
        group_id: &'a str,
        project: &'a mut Project,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let (group, _): (Group, _) =
                self.get(&format!("groups/{}", encode(group_id)), 1).await?;
            project.id = group.id.to_string();
            if project.name.is_empty() {
                project.name = group.name;
            }
            if project.desc.is_empty() {
                project.desc = group.description.unwrap_or_default();
            }

            project.sub_projects = self
                .list::<Group>(group_id, "subgroups")
                .await?
                .into_iter()
                .map(group_to_project)
                .collect();
            for sub in project.sub_projects.iter_mut() {
                let id = sub.id.clone();
                self.load_group(&id, sub).await?;
            }

            project.repos = self
                .list::<GroupProject>(group_id, "projects")
                .await?
                .into_iter()
                .filter_map(map_project)
                .collect();
            Ok(())
        })
    }

    /// Every page of `groups/<id>/<what>`
    async fn list<T: for<'de> Deserialize<'de>>(
        &self,
        group_id: &str,
        what: &str,
    ) -> Result<Vec<T>> {
        let path = format!("groups/{}/{}", encode(group_id), what);
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            info!(group = group_id, what, page, "Fetching GitLab {}", what);
            let (batch, next): (Vec<T>, Option<u32>) = self.get(&path, page).await?;
            items.extend(batch);
            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }
        }
        Ok(items)
    }

    /// GET one page, returning the body and the `X-Next-Page` header
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        page: u32,
    ) -> Result<(T, Option<u32>)> {
        let url = format!("{}/{}", self.api_url, path);
        debug!(url = %url, page, "GitLab request");

        let page = page.to_string();
        let response = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .header("Accept", "application/json")
            .query(&[("per_page", PER_PAGE), ("page", page.as_str())])
            .send()
            .await?;

        let next = response
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = http::json("gitlab", response).await?;
        Ok((body, next))
    }
}

#[async_trait]
impl RepoProvider for GitLabProvider {
    async fn load_repos(
        &self,
        search: &str,
        _git: &dyn GitCapability,
        project: &mut Project,
    ) -> gits_core::Result<()> {
        self.load_group(search, project).await?;
        if project.repo_count() == 0 {
            return Err(crate::Error::Empty(format!("gitlab group {}", search)).into());
        }
        Ok(())
    }
}

/// Group ids may be numeric or a full path (`group/sub`)
fn encode(group_id: &str) -> String {
    url::form_urlencoded::byte_serialize(group_id.as_bytes()).collect()
}

fn group_to_project(group: Group) -> Project {
    Project {
        id: group.id.to_string(),
        name: group.path,
        desc: group.description.unwrap_or_default(),
        ..Default::default()
    }
}

fn map_project(p: GroupProject) -> Option<Repository> {
    if p.archived || p.empty_repo {
        return None;
    }
    Some(Repository {
        id: p.id.to_string(),
        name: p.path,
        namespace: p.namespace.full_path,
        src: p.ssh_url_to_repo,
        url: p.web_url,
        desc: p.description.unwrap_or_default(),
        ..Default::default()
    })
}
