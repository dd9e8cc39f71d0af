//! Schema variants observed in condition page payloads
//!
//! The API never declares which shape a page uses. Two shapes appear in the
//! wild, sometimes together in a single payload.

use serde_json::Value;
use std::fmt;

/// Key holding the nested markdown tree
pub const MARKDOWN_TREE_KEY: &str = "mainEntityOfPage";

/// Key holding the nested structured parts
pub const STRUCTURED_PARTS_KEY: &str = "hasPart";

/// One of the known payload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    /// Nested `mainEntityOfPage` lists whose `name == "markdown"` leaves carry text
    MarkdownTree,

    /// Nested `hasPart` lists where every node carries headline, description and text
    StructuredParts,

    /// Neither key is present at the top level
    Unknown,
}

impl SchemaVariant {
    /// The top-level key that identifies this variant
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::MarkdownTree => Some(MARKDOWN_TREE_KEY),
            Self::StructuredParts => Some(STRUCTURED_PARTS_KEY),
            Self::Unknown => None,
        }
    }

    /// Detects which variants a decoded payload carries
    ///
    /// Variants are returned in extraction order (markdown tree first).
    /// A payload that carries neither yields `[Unknown]`.
    pub fn detect(payload: &Value) -> Vec<Self> {
        let mut variants = Vec::new();

        if let Some(object) = payload.as_object() {
            for variant in [Self::MarkdownTree, Self::StructuredParts] {
                if variant.key().is_some_and(|key| object.contains_key(key)) {
                    variants.push(variant);
                }
            }
        }

        if variants.is_empty() {
            variants.push(Self::Unknown);
        }
        variants
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MarkdownTree => "markdown_tree",
            Self::StructuredParts => "structured_parts",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_markdown_tree() {
        let payload = json!({ "mainEntityOfPage": [] });
        assert_eq!(
            SchemaVariant::detect(&payload),
            vec![SchemaVariant::MarkdownTree]
        );
    }

    #[test]
    fn test_detect_both_in_extraction_order() {
        let payload = json!({ "hasPart": [], "mainEntityOfPage": [] });
        assert_eq!(
            SchemaVariant::detect(&payload),
            vec![SchemaVariant::MarkdownTree, SchemaVariant::StructuredParts]
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(
            SchemaVariant::detect(&json!({ "name": "Acne" })),
            vec![SchemaVariant::Unknown]
        );
        assert_eq!(
            SchemaVariant::detect(&json!([1, 2, 3])),
            vec![SchemaVariant::Unknown]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SchemaVariant::MarkdownTree.to_string(), "markdown_tree");
        assert_eq!(SchemaVariant::Unknown.to_string(), "unknown");
    }
}
