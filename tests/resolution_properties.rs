//! Property tests for reference resolution over arbitrarily nested
//! attribute types.

use catsync::{
    AttributeDefinition, AttributeType, Reference, ReferenceCache, ReferenceResolver,
    ResourceDraft, ResourceType, ScalarKind,
};
use proptest::prelude::*;
use std::num::NonZeroUsize;
use std::sync::Arc;

fn resolver() -> ReferenceResolver {
    ReferenceResolver::new(Arc::new(ReferenceCache::new(
        NonZeroUsize::new(1_000).unwrap(),
    )))
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").unwrap()
}

/// A nested attribute pointing at `target_key` by expanded id, wrapped in
/// `depth` sets
fn nested_attribute(name: &str, target_key: &str, depth: usize) -> AttributeDefinition {
    let reference = Reference::of_id(ResourceType::ProductTypes, format!("id-{}", target_key))
        .expanded(target_key);
    AttributeDefinition::new(name, AttributeType::nested(reference).wrapped_in_sets(depth))
}

proptest! {
    /// Any depth resolves to a key reference at the same depth
    #[test]
    fn nested_reference_resolves_at_depth(key in key_strategy(), depth in 0usize..=6) {
        let draft = ResourceDraft::new(ResourceType::ProductTypes, "outer")
            .with_attribute(nested_attribute("component", &key, depth))
            .with_attribute(AttributeDefinition::new("title", AttributeType::scalar(ScalarKind::Text)));

        let resolved = resolver().resolve_draft(&draft).unwrap();
        let (reference, found_depth) = resolved.attributes[0]
            .attribute_type
            .innermost_reference()
            .unwrap();

        prop_assert_eq!(found_depth, depth);
        prop_assert_eq!(reference.key(), Some(key.as_str()));
        prop_assert_eq!(&resolved.attributes[1], &draft.attributes[1]);
    }

    /// Resolving an already resolved draft changes nothing
    #[test]
    fn resolution_is_idempotent(
        keys in prop::collection::vec(key_strategy(), 1..5),
        depths in prop::collection::vec(0usize..=4, 1..5),
    ) {
        let draft = keys.iter().zip(depths.iter()).enumerate().fold(
            ResourceDraft::new(ResourceType::ProductTypes, "outer"),
            |draft, (i, (key, depth))| {
                draft.with_attribute(nested_attribute(&format!("attr-{}", i), key, *depth))
            },
        );

        let resolver = resolver();
        let once = resolver.resolve_draft(&draft).unwrap();
        let twice = resolver.resolve_draft(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Ids learned from expansions resolve later references without one
    #[test]
    fn cached_ids_resolve_unexpanded_references(key in key_strategy()) {
        let resolver = resolver();
        let expanded = Reference::of_id(ResourceType::Categories, "c-1").expanded(key.clone());
        resolver.resolve_reference(&expanded).unwrap();

        let bare = Reference::of_id(ResourceType::Categories, "c-1");
        let resolved = resolver.resolve_reference(&bare).unwrap();
        prop_assert_eq!(resolved, Reference::of_key(ResourceType::Categories, key));
    }
}
