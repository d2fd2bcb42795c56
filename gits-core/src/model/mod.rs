//! Projects, repositories and provider sources
//!
//! These are plain value types. The resolver builds them fresh on every run from
//! config, cache and provider calls; only the declared and fetched fields are
//! ever persisted (inside a cache record).

mod project;
mod repo;
mod source;

pub use project::{Project, Selection};
pub use repo::{RepoState, Repository, UNNAMED};
pub use source::{ProviderSource, SourceKind};
