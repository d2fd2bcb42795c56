//! Hosted git providers for gits
//!
//! Clients for GitHub (GraphQL search through octocrab), GitLab and Bitbucket
//! (REST through reqwest), plus [`Providers`], the factory the resolver uses to
//! pick a client for each project source.

pub mod bitbucket;
pub mod error;
pub mod github;
pub mod gitlab;
mod http;
pub mod provider;

pub use bitbucket::BitbucketProvider;
pub use error::{Error, Result};
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use provider::{Provider, Providers};
