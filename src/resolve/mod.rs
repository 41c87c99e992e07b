//! Reference resolution: rewrite reference ids into keys
//!
//! Resources fetched from a source catalog point at each other by remote id,
//! which means nothing to the target catalog. Before drafts can be matched
//! and diffed, every reference has to carry the referenced resource's key.
//!
//! A key is found, in order:
//! 1. the reference already holds a key: kept as is
//! 2. the shared [`ReferenceCache`] knows the id
//! 3. the reference was expanded by the query (see [`ExpansionPath`]); the
//!    expanded key is used and cached
//!
//! Otherwise the reference is unresolved. The resolver never talks to the
//! catalog itself.

pub mod cache;
pub mod expansion;

pub use cache::{CacheStats, ReferenceCache};
pub use expansion::ExpansionPath;

use crate::error::ReferenceError;
use crate::model::{AttributeType, Reference, ReferenceTarget, ResourceDraft};
use std::sync::Arc;

/// Outcome of resolving a collection of drafts
///
/// Drafts that resolved are returned even when others failed; `error`
/// then holds one aggregate `ReferenceReplacement` naming every failing
/// draft.
#[derive(Debug)]
pub struct Resolution {
    pub drafts: Vec<ResourceDraft>,
    pub error: Option<ReferenceError>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the partial result when anything failed
    pub fn into_result(self) -> Result<Vec<ResourceDraft>, ReferenceError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.drafts),
        }
    }
}

#[derive(Clone)]
pub struct ReferenceResolver {
    cache: Arc<ReferenceCache>,
}

impl ReferenceResolver {
    pub fn new(cache: Arc<ReferenceCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// Resolve a single reference to a key reference
    pub fn resolve_reference(&self, reference: &Reference) -> Result<Reference, ReferenceError> {
        let id = match &reference.target {
            ReferenceTarget::Id(id) => id,
            ReferenceTarget::Key(key) => return Ok(Reference::of_key(reference.type_id, key.clone())),
        };

        if let Some(key) = self.cache.get(reference.type_id, id) {
            return Ok(Reference::of_key(reference.type_id, key));
        }

        match reference.expanded_key() {
            Some(key) => {
                self.cache.insert(reference.type_id, id, key);
                Ok(Reference::of_key(reference.type_id, key))
            }
            None => Err(ReferenceError::UnresolvedReference {
                resource_type: reference.type_id,
                id: id.to_string(),
            }),
        }
    }

    /// Rewrite the reference inside a nested type, descending through sets
    pub fn resolve_attribute_type(
        &self,
        attribute_type: &AttributeType,
    ) -> Result<AttributeType, ReferenceError> {
        match attribute_type {
            AttributeType::Nested { type_reference } => {
                Ok(AttributeType::nested(self.resolve_reference(type_reference)?))
            }
            AttributeType::Set { element_type } => {
                Ok(AttributeType::set_of(self.resolve_attribute_type(element_type)?))
            }
            scalar @ AttributeType::Scalar { .. } => Ok(scalar.clone()),
        }
    }

    /// Resolve every reference field and attribute definition of one draft
    ///
    /// All of them are attempted; the error lists each one that failed.
    pub fn resolve_draft(&self, draft: &ResourceDraft) -> Result<ResourceDraft, ReferenceError> {
        let mut causes = Vec::new();
        let mut resolved = draft.clone();

        for (field, reference) in &draft.references {
            match self.resolve_reference(reference) {
                Ok(key_reference) => {
                    resolved.references.insert(field.clone(), key_reference);
                }
                Err(err) => causes.push(ReferenceError::InvalidReferenceField {
                    field: field.clone(),
                    source: Box::new(err),
                }),
            }
        }

        resolved.attributes = draft
            .attributes
            .iter()
            .filter_map(|attribute| {
                match self.resolve_attribute_type(&attribute.attribute_type) {
                    Ok(attribute_type) => Some(attribute.with_type(attribute_type)),
                    Err(err) => {
                        causes.push(ReferenceError::InvalidAttributeDefinition {
                            attribute: attribute.name.clone(),
                            source: Box::new(err),
                        });
                        None
                    }
                }
            })
            .collect();

        if causes.is_empty() {
            Ok(resolved)
        } else {
            Err(ReferenceError::InvalidResource {
                resource_type: draft.resource_type,
                key: draft.effective_key().unwrap_or("null").to_string(),
                causes,
            })
        }
    }

    /// Resolve a collection of drafts, keeping the ones that succeeded
    pub fn resolve_all<'a, I>(&self, drafts: I) -> Resolution
    where
        I: IntoIterator<Item = &'a ResourceDraft>,
    {
        let mut resolved = Vec::new();
        let mut causes = Vec::new();

        for draft in drafts {
            match self.resolve_draft(draft) {
                Ok(draft) => resolved.push(draft),
                Err(err) => {
                    tracing::debug!("Reference replacement failed: {}", err);
                    causes.push(err);
                }
            }
        }

        let error = if causes.is_empty() {
            None
        } else {
            Some(ReferenceError::ReferenceReplacement { causes })
        };

        Resolution {
            drafts: resolved,
            error,
        }
    }
}
