use super::ResourceType;
use serde::{Deserialize, Serialize};

/// What a reference currently points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceTarget {
    /// Remote identifier, only meaningful inside the source catalog
    Id(String),
    /// Stable key, meaningful across catalogs
    Key(String),
}

/// Body of the referenced resource when the query asked for expansion
///
/// Only the parts needed to resolve a key are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Pointer from one resource to another
///
/// Equality ignores `obj`: two references are equal when they point at the
/// same target, whether or not either side was expanded.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub type_id: ResourceType,
    #[serde(flatten)]
    pub target: ReferenceTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<Expansion>,
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.target == other.target
    }
}

impl Reference {
    pub fn of_id(type_id: ResourceType, id: impl Into<String>) -> Self {
        Self {
            type_id,
            target: ReferenceTarget::Id(id.into()),
            obj: None,
        }
    }

    pub fn of_key(type_id: ResourceType, key: impl Into<String>) -> Self {
        Self {
            type_id,
            target: ReferenceTarget::Key(key.into()),
            obj: None,
        }
    }

    /// Attach an expanded body carrying the referenced resource's key
    pub fn expanded(mut self, key: impl Into<String>) -> Self {
        let id = match &self.target {
            ReferenceTarget::Id(id) => id.clone(),
            ReferenceTarget::Key(key) => key.clone(),
        };
        self.obj = Some(Expansion {
            id,
            key: Some(key.into()),
        });
        self
    }

    pub fn id(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::Id(id) => Some(id),
            ReferenceTarget::Key(_) => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::Key(key) => Some(key),
            ReferenceTarget::Id(_) => None,
        }
    }

    /// Key carried by the expanded body, if the reference was expanded
    pub fn expanded_key(&self) -> Option<&str> {
        self.obj.as_ref().and_then(|obj| obj.key.as_deref())
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.target, ReferenceTarget::Key(_))
    }
}
