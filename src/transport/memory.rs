use super::CatalogClient;
use crate::error::{RemoteError, SyncError};
use crate::model::{AttributeType, Expansion, ExistingResource, Reference, ResourceDraft, ResourceType};
use crate::resolve::ExpansionPath;
use crate::sync::diff::UpdateAction;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Number of requests served, per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub finds: usize,
    pub creates: usize,
    pub updates: usize,
    pub queries: usize,
}

#[derive(Default)]
struct Counters {
    finds: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    queries: AtomicUsize,
}

#[derive(Default)]
struct CatalogState {
    resources: BTreeMap<String, ExistingResource>,
    next_id: u64,
    /// Updates still to be answered with a conflict
    pending_conflicts: usize,
}

impl CatalogState {
    fn find_by_key(&self, resource_type: ResourceType, key: &str) -> Option<&ExistingResource> {
        self.resources
            .values()
            .find(|r| r.resource_type == resource_type && r.key.as_deref().map(str::trim) == Some(key))
    }

    fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("r{:06}", self.next_id);
            if !self.resources.contains_key(&id) {
                return id;
            }
        }
    }
}

/// In-process catalog with optimistic versioning
///
/// Behaves like a remote catalog as far as the sync engine can tell:
/// versions are checked on every update, configured fields must be unique
/// per resource type, and each request yields to the scheduler once so that
/// drafts running in the same window interleave.
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    unique_fields: Vec<String>,
    check_references: bool,
    counters: Counters,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState::default()),
            unique_fields: Vec::new(),
            check_references: false,
            counters: Counters::default(),
        }
    }

    /// Reject writes that leave two resources of a type with the same value
    /// in `field`
    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    /// Reject writes whose references point at resources that don't exist
    pub fn with_reference_checks(mut self) -> Self {
        self.check_references = true;
        self
    }

    /// Load a catalog previously written by [`MemoryCatalog::save`]; a
    /// missing file yields an empty catalog
    pub async fn open(path: &Path) -> Result<Self, SyncError> {
        let catalog = Self::new();
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let resources: Vec<ExistingResource> = serde_json::from_str(&contents)
                    .map_err(|e| {
                        SyncError::Catalog(format!(
                            "Failed to parse catalog {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                tracing::debug!(
                    "Loaded {} resource(s) from {}",
                    resources.len(),
                    path.display()
                );
                catalog.insert_all(resources);
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Catalog {} does not exist yet, starting empty", path.display());
                Ok(catalog)
            }
            Err(e) => Err(SyncError::Catalog(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write every stored resource to `path` as a JSON array
    pub async fn save(&self, path: &Path) -> Result<(), SyncError> {
        let contents = serde_json::to_string_pretty(&self.all())
            .map_err(|e| SyncError::Catalog(format!("Failed to serialize catalog: {}", e)))?;
        tokio::fs::write(path, contents).await.map_err(|e| {
            SyncError::Catalog(format!("Failed to write catalog {}: {}", path.display(), e))
        })
    }

    /// Store resources as they are, ids and versions included
    pub fn insert_all<I>(&self, resources: I)
    where
        I: IntoIterator<Item = ExistingResource>,
    {
        let mut state = self.lock();
        for resource in resources {
            state.resources.insert(resource.id.clone(), resource);
        }
    }

    /// Store a draft directly at version 1, bypassing every check
    pub fn seed(&self, draft: &ResourceDraft) -> ExistingResource {
        let mut state = self.lock();
        let id = state.allocate_id();
        let resource = ExistingResource::from_draft(draft, id, 1);
        state.resources.insert(resource.id.clone(), resource.clone());
        resource
    }

    /// Snapshot of every stored resource, ordered by id
    pub fn all(&self) -> Vec<ExistingResource> {
        self.lock().resources.values().cloned().collect()
    }

    pub fn get(&self, resource_type: ResourceType, key: &str) -> Option<ExistingResource> {
        self.lock().find_by_key(resource_type, key).cloned()
    }

    /// Delete a stored resource as another client would
    pub fn remove(&self, resource_type: ResourceType, key: &str) -> Option<ExistingResource> {
        let mut state = self.lock();
        let id = state.find_by_key(resource_type, key)?.id.clone();
        state.resources.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Answer the next `count` updates with a conflict, bumping the stored
    /// version each time as another writer would
    pub fn simulate_concurrent_writes(&self, count: usize) {
        self.lock().pending_conflicts += count;
    }

    pub fn request_counts(&self) -> RequestCounts {
        RequestCounts {
            finds: self.counters.finds.load(Ordering::Relaxed),
            creates: self.counters.creates.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_unique_fields(
        &self,
        state: &CatalogState,
        candidate: &ExistingResource,
    ) -> Result<(), RemoteError> {
        if let Some(key) = candidate.key.as_deref() {
            if let Some(other) = state.find_by_key(candidate.resource_type, key.trim()) {
                if other.id != candidate.id {
                    return Err(RemoteError::duplicate_field(
                        "key",
                        &Value::String(key.to_string()),
                        other.key.as_deref().unwrap_or_default(),
                    ));
                }
            }
        }

        for field in &self.unique_fields {
            let Some(value) = candidate.fields.get(field) else {
                continue;
            };
            let clash = state.resources.values().find(|other| {
                other.id != candidate.id
                    && other.resource_type == candidate.resource_type
                    && other.fields.get(field) == Some(value)
            });
            if let Some(other) = clash {
                return Err(RemoteError::duplicate_field(
                    field,
                    value,
                    other.key.as_deref().unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }

    fn check_reference_targets(
        &self,
        state: &CatalogState,
        candidate: &ExistingResource,
    ) -> Result<(), RemoteError> {
        if !self.check_references {
            return Ok(());
        }
        let nested = candidate
            .attributes
            .iter()
            .filter_map(|a| a.attribute_type.innermost_reference())
            .map(|(reference, _)| reference);

        for reference in candidate.references.values().chain(nested) {
            let exists = match (reference.id(), reference.key()) {
                (Some(id), _) => state
                    .resources
                    .get(id)
                    .is_some_and(|r| r.resource_type == reference.type_id),
                (None, Some(key)) => state.find_by_key(reference.type_id, key).is_some(),
                (None, None) => false,
            };
            if !exists {
                return Err(RemoteError::Validation {
                    message: format!(
                        "The referenced {} '{}' does not exist.",
                        reference.type_id,
                        reference.id().or(reference.key()).unwrap_or_default()
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalog {
    async fn find(
        &self,
        resource_type: ResourceType,
        key: &str,
    ) -> Result<Option<ExistingResource>, RemoteError> {
        tokio::task::yield_now().await;
        self.counters.finds.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock().find_by_key(resource_type, key.trim()).cloned())
    }

    async fn create(&self, draft: &ResourceDraft) -> Result<ExistingResource, RemoteError> {
        tokio::task::yield_now().await;
        self.counters.creates.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock();
        let id = state.allocate_id();
        let resource = ExistingResource::from_draft(draft, id, 1);
        self.check_unique_fields(&state, &resource)?;
        self.check_reference_targets(&state, &resource)?;

        state.resources.insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }

    async fn update(
        &self,
        existing: &ExistingResource,
        actions: &[UpdateAction],
    ) -> Result<ExistingResource, RemoteError> {
        tokio::task::yield_now().await;
        self.counters.updates.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock();
        let key = existing.key.clone().unwrap_or_default();
        let Some(stored) = state.resources.get(&existing.id).cloned() else {
            return Err(RemoteError::NotFound {
                resource_type: existing.resource_type,
                key,
            });
        };

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            let actual = stored.version + 1;
            if let Some(stored) = state.resources.get_mut(&existing.id) {
                stored.version = actual;
            }
            return Err(RemoteError::Conflict {
                resource_type: existing.resource_type,
                key,
                expected: existing.version,
                actual,
            });
        }

        if stored.version != existing.version {
            return Err(RemoteError::Conflict {
                resource_type: existing.resource_type,
                key,
                expected: existing.version,
                actual: stored.version,
            });
        }

        let mut updated = stored;
        for action in actions {
            action.apply(&mut updated);
        }
        self.check_unique_fields(&state, &updated)?;
        self.check_reference_targets(&state, &updated)?;
        updated.version += 1;

        state.resources.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn query(
        &self,
        resource_type: ResourceType,
        expansions: &[ExpansionPath],
    ) -> Result<Vec<ExistingResource>, RemoteError> {
        tokio::task::yield_now().await;
        self.counters.queries.fetch_add(1, Ordering::Relaxed);

        let state = self.lock();
        let mut results: Vec<ExistingResource> = state
            .resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect();

        for resource in &mut results {
            for path in expansions {
                match *path {
                    ExpansionPath::ReferenceFields => {
                        for reference in resource.references.values_mut() {
                            expand(&state, reference);
                        }
                    }
                    ExpansionPath::NestedType { collection_depth } => {
                        for attribute in &mut resource.attributes {
                            if let Some(reference) =
                                nested_reference_at(&mut attribute.attribute_type, collection_depth)
                            {
                                expand(&state, reference);
                            }
                        }
                    }
                }
            }
        }
        Ok(results)
    }
}

fn expand(state: &CatalogState, reference: &mut Reference) {
    let Some(id) = reference.id() else {
        return;
    };
    if let Some(target) = state.resources.get(id) {
        reference.obj = Some(Expansion {
            id: target.id.clone(),
            key: target.key.clone(),
        });
    }
}

/// Type reference of a nested attribute wrapped in exactly `depth` sets
fn nested_reference_at(attribute_type: &mut AttributeType, depth: usize) -> Option<&mut Reference> {
    match attribute_type {
        AttributeType::Nested { type_reference } if depth == 0 => Some(type_reference),
        AttributeType::Set { element_type } if depth > 0 => {
            nested_reference_at(element_type, depth - 1)
        }
        _ => None,
    }
}
