pub mod memory;

use crate::error::RemoteError;
use crate::model::{ExistingResource, ResourceDraft, ResourceType};
use crate::resolve::ExpansionPath;
use crate::sync::diff::UpdateAction;
use async_trait::async_trait;

pub use memory::{MemoryCatalog, RequestCounts};

/// Catalog operations the sync engine depends on
///
/// Implementations own transport concerns: timeouts and retrying transient
/// network failures happen below this trait. What surfaces here is either a
/// result or a [`RemoteError`] the engine can classify: a `Conflict` when an
/// update's version token is stale, `Validation` for permanent rejections.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the resource of `resource_type` with `key`, if any
    async fn find(
        &self,
        resource_type: ResourceType,
        key: &str,
    ) -> Result<Option<ExistingResource>, RemoteError>;

    /// Create a resource from a draft
    async fn create(&self, draft: &ResourceDraft) -> Result<ExistingResource, RemoteError>;

    /// Apply `actions` to `existing`, guarded by `existing.version`
    async fn update(
        &self,
        existing: &ExistingResource,
        actions: &[UpdateAction],
    ) -> Result<ExistingResource, RemoteError>;

    /// Fetch every resource of a type, expanding the given reference paths
    async fn query(
        &self,
        resource_type: ResourceType,
        expansions: &[ExpansionPath],
    ) -> Result<Vec<ExistingResource>, RemoteError>;
}
