use super::Reference;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    Text,
    LocalizedText,
    Number,
    Boolean,
    Money,
    Date,
}

/// Type of an attribute definition
///
/// `Nested` embeds a reference to another product type; `Set` wraps any
/// other attribute type, including further sets, to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum AttributeType {
    Scalar {
        kind: ScalarKind,
    },
    Nested {
        #[serde(rename = "typeReference")]
        type_reference: Reference,
    },
    Set {
        #[serde(rename = "elementType")]
        element_type: Box<AttributeType>,
    },
}

impl AttributeType {
    pub fn scalar(kind: ScalarKind) -> Self {
        AttributeType::Scalar { kind }
    }

    pub fn nested(type_reference: Reference) -> Self {
        AttributeType::Nested { type_reference }
    }

    pub fn set_of(element_type: AttributeType) -> Self {
        AttributeType::Set {
            element_type: Box::new(element_type),
        }
    }

    /// Wrap `self` in `depth` levels of `Set`
    pub fn wrapped_in_sets(self, depth: usize) -> Self {
        (0..depth).fold(self, |inner, _| AttributeType::set_of(inner))
    }

    /// The nested reference at the bottom of the set chain, and its set depth
    pub fn innermost_reference(&self) -> Option<(&Reference, usize)> {
        let mut depth = 0;
        let mut current = self;
        loop {
            match current {
                AttributeType::Scalar { .. } => return None,
                AttributeType::Nested { type_reference } => return Some((type_reference, depth)),
                AttributeType::Set { element_type } => {
                    depth += 1;
                    current = element_type;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub is_required: bool,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            label: None,
            attribute_type,
            is_required: false,
        }
    }

    pub fn with_type(&self, attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            ..self.clone()
        }
    }
}
