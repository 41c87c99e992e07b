use super::{AttributeDefinition, Reference, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Desired state of one catalog resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    pub resource_type: ResourceType,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDefinition>,
}

impl ResourceDraft {
    pub fn new(resource_type: ResourceType, key: impl Into<String>) -> Self {
        Self {
            resource_type,
            key: Some(key.into()),
            name: None,
            fields: BTreeMap::new(),
            references: BTreeMap::new(),
            attributes: Vec::new(),
        }
    }

    /// Draft without a key; rejected by validation
    pub fn without_key(resource_type: ResourceType) -> Self {
        Self {
            key: None,
            ..Self::new(resource_type, "")
        }
    }

    pub fn with_key(mut self, key: Option<&str>) -> Self {
        self.key = key.map(str::to_string);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>, reference: Reference) -> Self {
        self.references.insert(name.into(), reference);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Key with surrounding whitespace removed; `None` when null or blank
    pub fn effective_key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Name used in messages about this draft
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("null")
    }
}

/// A resource as currently stored by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingResource {
    pub id: String,
    pub version: u64,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDefinition>,
}

impl ExistingResource {
    /// Materialize a draft as stored state with the given id and version
    pub fn from_draft(draft: &ResourceDraft, id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            version,
            resource_type: draft.resource_type,
            key: draft.key.clone(),
            name: draft.name.clone(),
            fields: draft.fields.clone(),
            references: draft.references.clone(),
            attributes: draft.attributes.clone(),
        }
    }
}

impl From<&ExistingResource> for ResourceDraft {
    /// Draft describing the resource as it is; references keep their ids and
    /// expansions so they can be resolved to keys afterwards.
    fn from(resource: &ExistingResource) -> Self {
        Self {
            resource_type: resource.resource_type,
            key: resource.key.clone(),
            name: resource.name.clone(),
            fields: resource.fields.clone(),
            references: resource.references.clone(),
            attributes: resource.attributes.clone(),
        }
    }
}
