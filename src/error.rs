use crate::model::ResourceType;
use thiserror::Error;

/// Local validation failures, raised before anything is sent to the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Draft is null.")]
    NullDraft,

    #[error("Draft with name: {name} doesn't have a key.")]
    MissingKey { name: String },
}

/// Failures while rewriting reference ids to keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A single reference whose target was neither cached nor expanded
    #[error("{resource_type} reference with id '{id}' is not expanded.")]
    UnresolvedReference {
        resource_type: ResourceType,
        id: String,
    },

    /// One attribute definition of a resource could not be rewritten
    #[error("Failed to replace some references on the attribute definition with name '{attribute}'. Cause: {source}")]
    InvalidAttributeDefinition {
        attribute: String,
        #[source]
        source: Box<ReferenceError>,
    },

    /// One reference field of a resource could not be rewritten
    #[error("Failed to replace the reference on the field '{field}'. Cause: {source}")]
    InvalidReferenceField {
        field: String,
        #[source]
        source: Box<ReferenceError>,
    },

    /// Every reference failure of one resource
    #[error("Failed to replace some references on the {resource_type} with key '{key}'.")]
    InvalidResource {
        resource_type: ResourceType,
        key: String,
        causes: Vec<ReferenceError>,
    },

    /// Aggregate over a whole batch; carries one `InvalidResource` per failing draft
    #[error("Some errors occurred during reference replacement.")]
    ReferenceReplacement { causes: Vec<ReferenceError> },
}

impl ReferenceError {
    /// Keys of the resources named by this error (empty for leaf errors)
    pub fn failed_keys(&self) -> Vec<&str> {
        match self {
            ReferenceError::InvalidResource { key, .. } => vec![key.as_str()],
            ReferenceError::ReferenceReplacement { causes } => {
                causes.iter().flat_map(|c| c.failed_keys()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Failures reported by the catalog client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The version token sent with an update is stale
    #[error("Version mismatch on {resource_type} '{key}': expected version {expected}, current version is {actual}.")]
    Conflict {
        resource_type: ResourceType,
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Permanent rejection, e.g. a uniqueness violation
    #[error("{message}")]
    Validation { message: String },

    #[error("{resource_type} with key '{key}' was not found.")]
    NotFound {
        resource_type: ResourceType,
        key: String,
    },

    #[error("Transport error: {message}\nCheck the catalog endpoint and try again.")]
    Transport { message: String },
}

impl RemoteError {
    pub fn duplicate_field(field: &str, value: &serde_json::Value, owner_key: &str) -> Self {
        let quoted = value.to_string().replace('"', "\\\"");
        RemoteError::Validation {
            message: format!(
                "A duplicate value '{}' exists for field '{}' on resource with key '{}'.",
                quoted, field, owner_key
            ),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }
}

/// Cause handed to the error callback alongside the message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
