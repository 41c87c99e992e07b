pub mod attribute;
pub mod reference;
pub mod resource;

pub use attribute::{AttributeDefinition, AttributeType, ScalarKind};
pub use reference::{Expansion, Reference, ReferenceTarget};
pub use resource::{ExistingResource, ResourceDraft};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog resource kinds known to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Categories,
    Channels,
    CustomerGroups,
    Customers,
    Products,
    ProductTypes,
    States,
    TaxCategories,
    Types,
    ShoppingLists,
}

impl ResourceType {
    pub const ALL: [ResourceType; 10] = [
        ResourceType::Categories,
        ResourceType::Channels,
        ResourceType::CustomerGroups,
        ResourceType::Customers,
        ResourceType::Products,
        ResourceType::ProductTypes,
        ResourceType::States,
        ResourceType::TaxCategories,
        ResourceType::Types,
        ResourceType::ShoppingLists,
    ];

    /// Name used by the catalog's query endpoints
    pub fn query_name(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Channels => "channels",
            Self::CustomerGroups => "customerGroups",
            Self::Customers => "customers",
            Self::Products => "products",
            Self::ProductTypes => "productTypes",
            Self::States => "states",
            Self::TaxCategories => "taxCategories",
            Self::Types => "types",
            Self::ShoppingLists => "shoppingLists",
        }
    }

    pub fn from_query_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.query_name() == name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_names_round_trip() {
        for t in ResourceType::ALL {
            assert_eq!(ResourceType::from_query_name(t.query_name()), Some(t));
        }
        assert_eq!(ResourceType::from_query_name("orders"), None);
    }

    #[test]
    fn test_serde_uses_query_name() {
        let json = serde_json::to_string(&ResourceType::TaxCategories).unwrap();
        assert_eq!(json, r#""taxCategories""#);
    }
}
