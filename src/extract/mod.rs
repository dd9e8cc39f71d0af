//! Plain-text extraction from condition page payloads
//!
//! A condition page is a JSON document in one (or both) of the shapes
//! described by [`SchemaVariant`]. Extraction walks each tree with an
//! explicit stack, so deeply nested payloads cannot overflow the call stack.
//!
//! # Example
//!
//! ```
//! use condition_corpus::extract::extract;
//!
//! let payload = r#"{"hasPart":[{"headline":"H","description":"D","text":"T"}]}"#;
//! let extraction = extract(payload);
//! assert!(extraction.ok);
//! assert_eq!(extraction.text, "H D T ");
//! ```

mod schema;

pub use schema::{SchemaVariant, MARKDOWN_TREE_KEY, STRUCTURED_PARTS_KEY};

use serde_json::Value;

/// Nodes nested deeper than this are skipped
pub const MAX_NESTING_DEPTH: usize = 32;

/// Outcome of extracting text from one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted text; empty when nothing was extractable
    pub text: String,

    /// False only when the payload was not valid JSON
    pub ok: bool,

    /// Variants detected in the payload (empty when `ok` is false)
    pub variants: Vec<SchemaVariant>,
}

impl Extraction {
    fn failed() -> Self {
        Self {
            text: String::new(),
            ok: false,
            variants: Vec::new(),
        }
    }
}

/// Extracts plain text from a raw page payload
///
/// Markdown-tree output comes first, followed by structured-parts output.
/// A payload that is not JSON (some pages are served as bare HTML) yields
/// an empty, failed extraction; a JSON payload with no recognised content
/// yields empty text with `ok == true`.
pub fn extract(raw_payload: &str) -> Extraction {
    let payload: Value = match serde_json::from_str(raw_payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Payload is not JSON: {}", e);
            return Extraction::failed();
        }
    };

    let variants = SchemaVariant::detect(&payload);
    let mut text = String::new();

    for variant in &variants {
        match variant {
            SchemaVariant::MarkdownTree => walk(
                &payload[MARKDOWN_TREE_KEY],
                MARKDOWN_TREE_KEY,
                &mut text,
                append_markdown,
            ),
            SchemaVariant::StructuredParts => walk(
                &payload[STRUCTURED_PARTS_KEY],
                STRUCTURED_PARTS_KEY,
                &mut text,
                append_part,
            ),
            SchemaVariant::Unknown => {}
        }
    }

    Extraction {
        text,
        ok: true,
        variants,
    }
}

/// Pre-order, left-to-right traversal of the nested lists under `key`
fn walk(root: &Value, key: &str, out: &mut String, visit: fn(&Value, &mut String)) {
    let Some(top) = root.as_array() else {
        return;
    };

    let mut stack: Vec<(&Value, usize)> = top.iter().rev().map(|node| (node, 1)).collect();

    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_NESTING_DEPTH {
            tracing::debug!("Skipping node nested deeper than {}", MAX_NESTING_DEPTH);
            continue;
        }
        if !node.is_object() {
            continue;
        }

        visit(node, out);

        if let Some(children) = node.get(key).and_then(Value::as_array) {
            stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
        }
    }
}

fn append_markdown(node: &Value, out: &mut String) {
    if node.get("name").and_then(Value::as_str) == Some("markdown") {
        out.push_str(field(node, "text"));
    }
}

fn append_part(node: &Value, out: &mut String) {
    for name in ["headline", "description", "text"] {
        out.push_str(field(node, name));
        out.push(' ');
    }
}

fn field<'a>(node: &'a Value, name: &str) -> &'a str {
    node.get(name).and_then(Value::as_str).unwrap_or("")
}
