use crate::model::{AttributeDefinition, ExistingResource, Reference, ResourceDraft};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One field-level mutation sent to the catalog with an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UpdateAction {
    ChangeName {
        name: Option<String>,
    },
    /// `value: None` removes the field
    SetField {
        field: String,
        value: Option<Value>,
    },
    /// `reference: None` removes the reference
    SetReference {
        field: String,
        reference: Option<Reference>,
    },
    RemoveAttributeDefinition {
        name: String,
    },
    ChangeAttributeDefinition {
        attribute: AttributeDefinition,
    },
    AddAttributeDefinition {
        attribute: AttributeDefinition,
    },
}

impl UpdateAction {
    /// Action name as the catalog's update API spells it
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeName { .. } => "changeName",
            Self::SetField { .. } => "setField",
            Self::SetReference { .. } => "setReference",
            Self::RemoveAttributeDefinition { .. } => "removeAttributeDefinition",
            Self::ChangeAttributeDefinition { .. } => "changeAttributeDefinition",
            Self::AddAttributeDefinition { .. } => "addAttributeDefinition",
        }
    }

    /// Apply the mutation to a stored resource
    pub fn apply(&self, resource: &mut ExistingResource) {
        match self {
            Self::ChangeName { name } => resource.name = name.clone(),
            Self::SetField { field, value } => match value {
                Some(value) => {
                    resource.fields.insert(field.clone(), value.clone());
                }
                None => {
                    resource.fields.remove(field);
                }
            },
            Self::SetReference { field, reference } => match reference {
                Some(reference) => {
                    resource.references.insert(field.clone(), reference.clone());
                }
                None => {
                    resource.references.remove(field);
                }
            },
            Self::RemoveAttributeDefinition { name } => {
                resource.attributes.retain(|a| &a.name != name);
            }
            Self::ChangeAttributeDefinition { attribute } => {
                if let Some(current) = resource
                    .attributes
                    .iter_mut()
                    .find(|a| a.name == attribute.name)
                {
                    *current = attribute.clone();
                }
            }
            Self::AddAttributeDefinition { attribute } => {
                resource.attributes.push(attribute.clone());
            }
        }
    }
}

/// Computes the update actions that turn `existing` into `draft`
///
/// Implementations must be pure and return an empty list when both sides
/// are equal. Actions are dispatched in the returned order; an
/// implementation whose actions depend on each other must order them
/// itself.
pub trait DiffEngine: Send + Sync {
    fn diff(&self, existing: &ExistingResource, draft: &ResourceDraft) -> Vec<UpdateAction>;
}

impl<F> DiffEngine for F
where
    F: Fn(&ExistingResource, &ResourceDraft) -> Vec<UpdateAction> + Send + Sync,
{
    fn diff(&self, existing: &ExistingResource, draft: &ResourceDraft) -> Vec<UpdateAction> {
        self(existing, draft)
    }
}

/// Resource-agnostic diff over name, fields, references and attribute
/// definitions
///
/// Order: name, fields, references, then attribute removals before changes
/// before additions, so a removed definition's name is free by the time a
/// new one is added. Attribute definitions are matched by name; their order
/// in the list is not significant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeDiff;

impl DiffEngine for AttributeDiff {
    fn diff(&self, existing: &ExistingResource, draft: &ResourceDraft) -> Vec<UpdateAction> {
        let mut actions = Vec::new();

        if existing.name != draft.name {
            actions.push(UpdateAction::ChangeName {
                name: draft.name.clone(),
            });
        }

        for (field, value) in diff_maps(&existing.fields, &draft.fields) {
            actions.push(UpdateAction::SetField { field, value });
        }

        for (field, reference) in diff_maps(&existing.references, &draft.references) {
            actions.push(UpdateAction::SetReference { field, reference });
        }

        let wanted: BTreeMap<&str, &AttributeDefinition> = draft
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a))
            .collect();
        let current: BTreeMap<&str, &AttributeDefinition> = existing
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a))
            .collect();

        for name in current.keys().filter(|name| !wanted.contains_key(*name)) {
            actions.push(UpdateAction::RemoveAttributeDefinition {
                name: name.to_string(),
            });
        }
        for (name, attribute) in &wanted {
            if let Some(existing_attribute) = current.get(name) {
                if existing_attribute != attribute {
                    actions.push(UpdateAction::ChangeAttributeDefinition {
                        attribute: (*attribute).clone(),
                    });
                }
            }
        }
        for (name, attribute) in &wanted {
            if !current.contains_key(name) {
                actions.push(UpdateAction::AddAttributeDefinition {
                    attribute: (*attribute).clone(),
                });
            }
        }

        actions
    }
}

/// Entries to set (`Some`) or remove (`None`) so that `current` equals `wanted`
fn diff_maps<V: Clone + PartialEq>(
    current: &BTreeMap<String, V>,
    wanted: &BTreeMap<String, V>,
) -> Vec<(String, Option<V>)> {
    let names: BTreeSet<&String> = current.keys().chain(wanted.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| match (current.get(name), wanted.get(name)) {
            (Some(old), Some(new)) if old == new => None,
            (_, Some(new)) => Some((name.clone(), Some(new.clone()))),
            (Some(_), None) => Some((name.clone(), None)),
            (None, None) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeType, ResourceType, ScalarKind};
    use serde_json::json;

    fn product(key: &str) -> ResourceDraft {
        ResourceDraft::new(ResourceType::Products, key)
            .with_name("Shirt")
            .with_field("slug", json!("shirt"))
            .with_field("price", json!(1999))
            .with_reference("productType", Reference::of_key(ResourceType::ProductTypes, "apparel"))
            .with_attribute(AttributeDefinition::new(
                "material",
                AttributeType::scalar(ScalarKind::Text),
            ))
    }

    fn apply_all(existing: &ExistingResource, actions: &[UpdateAction]) -> ExistingResource {
        let mut updated = existing.clone();
        for action in actions {
            action.apply(&mut updated);
        }
        updated
    }

    #[test]
    fn test_equal_resources_produce_no_actions() {
        let draft = product("p1");
        let existing = ExistingResource::from_draft(&draft, "id-1", 4);
        assert!(AttributeDiff.diff(&existing, &draft).is_empty());
    }

    #[test]
    fn test_expansion_does_not_count_as_change() {
        let draft = product("p1");
        let mut existing = ExistingResource::from_draft(&draft, "id-1", 1);
        existing.references.insert(
            "productType".to_string(),
            Reference::of_key(ResourceType::ProductTypes, "apparel").expanded("apparel"),
        );
        assert!(AttributeDiff.diff(&existing, &draft).is_empty());
    }

    #[test]
    fn test_changed_fields_in_declared_order() {
        let existing = ExistingResource::from_draft(&product("p1"), "id-1", 1);
        let draft = product("p1")
            .with_name("Better Shirt")
            .with_field("price", json!(2499))
            .with_reference("taxCategory", Reference::of_key(ResourceType::TaxCategories, "std"));

        let actions = AttributeDiff.diff(&existing, &draft);
        let names: Vec<&str> = actions.iter().map(UpdateAction::name).collect();
        assert_eq!(names, vec!["changeName", "setField", "setReference"]);
        assert_eq!(
            actions[1],
            UpdateAction::SetField {
                field: "price".to_string(),
                value: Some(json!(2499)),
            }
        );
    }

    #[test]
    fn test_removed_field_is_unset() {
        let existing = ExistingResource::from_draft(&product("p1"), "id-1", 1);
        let mut draft = product("p1");
        draft.fields.remove("slug");

        let actions = AttributeDiff.diff(&existing, &draft);
        assert_eq!(
            actions,
            vec![UpdateAction::SetField {
                field: "slug".to_string(),
                value: None,
            }]
        );
    }

    #[test]
    fn test_attribute_removals_precede_additions() {
        let existing = ExistingResource::from_draft(&product("p1"), "id-1", 1);
        let mut draft = product("p1");
        draft.attributes = vec![
            AttributeDefinition::new("fabric", AttributeType::scalar(ScalarKind::Text)),
        ];

        let actions = AttributeDiff.diff(&existing, &draft);
        let names: Vec<&str> = actions.iter().map(UpdateAction::name).collect();
        assert_eq!(names, vec!["removeAttributeDefinition", "addAttributeDefinition"]);
    }

    #[test]
    fn test_applying_actions_converges() {
        let existing = ExistingResource::from_draft(&product("p1"), "id-1", 1);
        let mut draft = product("p1")
            .with_name("Renamed")
            .with_field("color", json!("blue"))
            .with_attribute(AttributeDefinition::new(
                "sizes",
                AttributeType::scalar(ScalarKind::Text).wrapped_in_sets(1),
            ));
        draft.fields.remove("price");
        draft.attributes[0].is_required = true;

        let actions = AttributeDiff.diff(&existing, &draft);
        let updated = apply_all(&existing, &actions);
        assert!(AttributeDiff.diff(&updated, &draft).is_empty());
    }

    #[test]
    fn test_closure_diff_engine() {
        let engine = |_: &ExistingResource, _: &ResourceDraft| {
            vec![UpdateAction::ChangeName { name: None }]
        };
        let draft = product("p1");
        let existing = ExistingResource::from_draft(&draft, "id", 1);
        assert_eq!(engine.diff(&existing, &draft).len(), 1);
    }
}
