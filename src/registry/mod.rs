//! External artifact store: the REST operations the engine reads from and
//! issues deletion requests to.

pub mod client;
pub mod models;
pub mod session;

use crate::core::errors::Result;
use crate::registry::models::{RepoTop, SearchResponse, Statistics, TagInfo};

/// Operations the retention engine needs from the registry.
///
/// Deletions are soft: the store only unlinks; space is reclaimed by a
/// separate garbage-collection pass.
pub trait RegistryStore {
    /// `GET /api/statistics`
    fn statistics(&self) -> Result<Statistics>;

    /// `GET /api/repositories/top?count=N`
    fn top_repositories(&self, count: u64) -> Result<Vec<RepoTop>>;

    /// `GET /api/search?q=...`; an empty query returns every repository.
    fn search(&self, query: &str) -> Result<SearchResponse>;

    /// `GET /api/repositories/{repo}/tags`
    fn list_tags(&self, repository: &str) -> Result<Vec<TagInfo>>;

    /// `DELETE /api/repositories/{repo}`
    fn delete_repository(&self, repository: &str) -> Result<()>;

    /// `DELETE /api/repositories/{repo}/tags/{tag}`
    fn delete_tag(&self, repository: &str, tag: &str) -> Result<()>;
}
