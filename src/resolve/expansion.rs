use std::fmt;

/// Reference paths a query must ask the catalog to expand before the
/// fetched resources can be resolved to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionPath {
    /// Every top-level reference field (`references[*]`)
    ReferenceFields,
    /// The type reference of nested attribute types wrapped in exactly
    /// `collection_depth` sets
    NestedType { collection_depth: usize },
}

impl ExpansionPath {
    /// Paths covering nested types wrapped in up to `max_collection_depth`
    /// sets.
    ///
    /// - depth 0: `attributes[*].type.typeReference`
    /// - depth 1: adds `attributes[*].type.elementType.typeReference`
    /// - depth 2: adds `attributes[*].type.elementType.elementType.typeReference`
    pub fn for_max_collection_depth(max_collection_depth: usize) -> Vec<Self> {
        (0..=max_collection_depth)
            .map(|collection_depth| ExpansionPath::NestedType { collection_depth })
            .collect()
    }

    pub fn parse(path: &str) -> Option<Self> {
        if path == "references[*]" {
            return Some(ExpansionPath::ReferenceFields);
        }
        let inner = path
            .strip_prefix("attributes[*].type.")?
            .strip_suffix("typeReference")?;
        let mut collection_depth = 0;
        let mut rest = inner;
        while let Some(next) = rest.strip_prefix("elementType.") {
            collection_depth += 1;
            rest = next;
        }
        rest.is_empty()
            .then_some(ExpansionPath::NestedType { collection_depth })
    }
}

impl fmt::Display for ExpansionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionPath::ReferenceFields => f.write_str("references[*]"),
            ExpansionPath::NestedType { collection_depth } => {
                f.write_str("attributes[*].type.")?;
                for _ in 0..*collection_depth {
                    f.write_str("elementType.")?;
                }
                f.write_str("typeReference")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_for_depth() {
        let paths: Vec<String> = ExpansionPath::for_max_collection_depth(2)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            paths,
            vec![
                "attributes[*].type.typeReference",
                "attributes[*].type.elementType.typeReference",
                "attributes[*].type.elementType.elementType.typeReference",
            ]
        );
        assert_eq!(ExpansionPath::for_max_collection_depth(0).len(), 1);
    }

    #[test]
    fn test_parse_matches_display() {
        for path in ExpansionPath::for_max_collection_depth(4) {
            assert_eq!(ExpansionPath::parse(&path.to_string()), Some(path));
        }
        assert_eq!(
            ExpansionPath::parse("references[*]"),
            Some(ExpansionPath::ReferenceFields)
        );
        assert_eq!(ExpansionPath::parse("attributes[*].type.elementType"), None);
        assert_eq!(ExpansionPath::parse("attributes[*].type.foo.typeReference"), None);
    }
}
