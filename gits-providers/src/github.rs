//! GitHub repository listing through the GraphQL search API

use std::time::Duration;

use async_trait::async_trait;
use gits_core::{GitCapability, Project, RepoProvider, Repository};
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{Error, Result};

/// Repositories per search page
const PAGE_SIZE: u32 = 100;

/// Pause between pages to stay friendly with the search rate limit
const PAGE_DELAY: Duration = Duration::from_millis(100);

const SEARCH_QUERY: &str = r#"
    query($query: String!, $count: Int!, $cursor: String) {
        search(first: $count, after: $cursor, query: $query, type: REPOSITORY) {
            repositoryCount
            pageInfo {
                endCursor
                hasNextPage
            }
            edges {
                node {
                    ... on Repository {
                        id
                        name
                        owner {
                            id
                            login
                        }
                        description
                        url
                        sshUrl
                        isArchived
                        isEmpty
                    }
                }
            }
        }
    }
"#;

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    repository_count: u64,
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<SearchEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct SearchEdge {
    node: RepoNode,
}

/// Search nodes that are not repositories come back as empty objects
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RepoNode {
    id: String,
    name: String,
    owner: Option<Owner>,
    description: Option<String>,
    url: String,
    ssh_url: String,
    is_archived: bool,
    is_empty: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Owner {
    id: String,
    login: String,
}

/// Lists an owner's repositories
pub struct GitHubProvider {
    client: Octocrab,
}

impl GitHubProvider {
    /// Create a provider authenticated with a personal access token
    pub fn new(token: Option<String>) -> Result<Self> {
        let token = token.ok_or_else(|| {
            Error::auth(
                "github",
                "token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/gits/secrets.toml",
            )
        })?;

        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| Error::auth("github", format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// All non-archived, non-empty repositories of `owner`, plus the owner id
    pub async fn fetch_repos(&self, owner: &str) -> Result<(Vec<Repository>, String)> {
        let mut cursor: Option<String> = None;
        let mut owner_id = String::new();
        let mut repos = Vec::new();
        let mut page = 0;

        loop {
            page += 1;
            info!(owner, page, "Fetching GitHub repositories");

            let body = json!({
                "query": SEARCH_QUERY,
                "variables": {
                    "query": search_query(owner),
                    "count": PAGE_SIZE,
                    "cursor": cursor,
                },
            });
            let response: GraphQLResponse<SearchData> = self.client.graphql(&body).await?;
            let search = unwrap_response(response)?.search;

            if search.edges.is_empty() || search.repository_count == 0 {
                break;
            }
            if owner_id.is_empty() {
                owner_id = first_owner_id(&search);
            }
            repos.extend(map_edges(search.edges));

            match search.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => break,
            }
            tokio::time::sleep(PAGE_DELAY).await;
        }

        Ok((repos, owner_id))
    }
}

#[async_trait]
impl RepoProvider for GitHubProvider {
    async fn load_repos(
        &self,
        search: &str,
        _git: &dyn GitCapability,
        project: &mut Project,
    ) -> gits_core::Result<()> {
        let (repos, owner_id) = self.fetch_repos(search).await?;
        if repos.is_empty() {
            return Err(Error::Empty(format!("github owner {}", search)).into());
        }
        project.id = owner_id;
        project.repos = repos;
        Ok(())
    }
}

/// Search qualifier for an owner; explicit qualifiers pass through
fn search_query(owner: &str) -> String {
    if owner.contains(':') {
        owner.to_string()
    } else {
        format!("org:{}", owner)
    }
}

fn unwrap_response<T>(response: GraphQLResponse<T>) -> Result<T> {
    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Other(format!("GraphQL errors: {}", messages.join(", "))));
    }
    response
        .data
        .ok_or_else(|| Error::Parse("GraphQL response missing data".to_string()))
}

fn first_owner_id(search: &SearchConnection) -> String {
    search
        .edges
        .iter()
        .find_map(|e| e.node.owner.as_ref().map(|o| o.id.clone()))
        .unwrap_or_default()
}

fn map_edges(edges: Vec<SearchEdge>) -> impl Iterator<Item = Repository> {
    edges
        .into_iter()
        .map(|edge| edge.node)
        .filter(|node| !node.name.is_empty() && !node.is_archived && !node.is_empty)
        .map(|node| Repository {
            id: node.id,
            name: node.name,
            namespace: node.owner.map(|o| o.login).unwrap_or_default(),
            src: node.ssh_url,
            url: node.url,
            desc: node.description.unwrap_or_default(),
            ..Default::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "data": {
            "search": {
                "repositoryCount": 3,
                "pageInfo": { "endCursor": "Y3Vyc29yOjM=", "hasNextPage": true },
                "edges": [
                    { "node": {
                        "id": "R_1", "name": "api",
                        "owner": { "id": "O_1", "login": "acme" },
                        "description": "REST API",
                        "url": "https://github.com/acme/api",
                        "sshUrl": "git@github.com:acme/api.git",
                        "isArchived": false, "isEmpty": false
                    } },
                    { "node": {
                        "id": "R_2", "name": "old",
                        "owner": { "id": "O_1", "login": "acme" },
                        "description": null,
                        "url": "https://github.com/acme/old",
                        "sshUrl": "git@github.com:acme/old.git",
                        "isArchived": true, "isEmpty": false
                    } },
                    { "node": {
                        "id": "R_3", "name": "blank",
                        "owner": { "id": "O_1", "login": "acme" },
                        "description": null,
                        "url": "https://github.com/acme/blank",
                        "sshUrl": "git@github.com:acme/blank.git",
                        "isArchived": false, "isEmpty": true
                    } },
                    { "node": {} }
                ]
            }
        }
    }"#;

    #[test]
    fn test_maps_search_page() {
        let response: GraphQLResponse<SearchData> = serde_json::from_str(PAGE).unwrap();
        let search = unwrap_response(response).unwrap().search;

        assert!(search.page_info.has_next_page);
        assert_eq!(first_owner_id(&search), "O_1");

        let repos: Vec<_> = map_edges(search.edges).collect();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "api");
        assert_eq!(repos[0].namespace, "acme");
        assert_eq!(repos[0].src, "git@github.com:acme/api.git");
        assert_eq!(repos[0].url, "https://github.com/acme/api");
        assert_eq!(repos[0].desc, "REST API");
    }

    #[test]
    fn test_graphql_errors_surface() {
        let response: GraphQLResponse<SearchData> = serde_json::from_str(
            r#"{ "data": null, "errors": [ { "message": "Bad credentials" } ] }"#,
        )
        .unwrap();
        let err = unwrap_response(response).unwrap_err();
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[test]
    fn test_search_query() {
        assert_eq!(search_query("acme"), "org:acme");
        assert_eq!(search_query("user:rafi"), "user:rafi");
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(
            GitHubProvider::new(None),
            Err(Error::Auth { .. })
        ));
    }
}
