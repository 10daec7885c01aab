use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Commit, Issue, NewsEvent, RepoId, Repository, TreeEntry};

/// Remote operations the repository view depends on. The view treats these as
/// opaque: each call either resolves with a payload or fails, and all state
/// transitions happen in the caller's update loop.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Fetch full repository metadata.
    async fn get_repo(&self, id: &RepoId) -> Result<Repository>;

    /// Whether the authenticated user has starred the repository.
    async fn is_starred(&self, id: &RepoId) -> Result<bool>;

    async fn star(&self, id: &RepoId) -> Result<()>;
    async fn unstar(&self, id: &RepoId) -> Result<()>;

    /// Fork the repository under the authenticated user; resolves with the
    /// new fork's metadata.
    async fn fork(&self, id: &RepoId) -> Result<Repository>;

    /// Permanently delete the repository.
    async fn delete_repo(&self, id: &RepoId) -> Result<()>;

    // Tab content
    async fn list_events(&self, id: &RepoId) -> Result<Vec<NewsEvent>>;
    async fn list_tree(&self, id: &RepoId, branch: &str) -> Result<Vec<TreeEntry>>;
    async fn list_commits(&self, id: &RepoId) -> Result<Vec<Commit>>;
    async fn list_issues(&self, id: &RepoId) -> Result<Vec<Issue>>;
}
