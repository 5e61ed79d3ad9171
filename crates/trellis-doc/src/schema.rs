//! JSON boundary for trees that were stored, edited or produced elsewhere.
//!
//! Documents are checked in three layers before anything renders them: a
//! nesting pre-scan on the raw text, the embedded JSON Schema, and the
//! per-node shape rules the serializer enforces.

use std::collections::HashSet;
use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::css::BreakpointTable;
use crate::data::DocumentNode;
use crate::error::{ConvertError, Result};
use crate::html::serialize::check_node_shape;
use crate::html::{DEFAULT_MAX_DEPTH, document_to_html_with};

/// Deepest node nesting accepted from JSON, matching the HTML depth limit.
pub const MAX_DOCUMENT_DEPTH: usize = DEFAULT_MAX_DEPTH;

/// JSON containers per node level: the node object and its `children` array.
const JSON_LEVELS_PER_NODE: usize = 2;

static NODE_SCHEMA: OnceLock<JSONSchema> = OnceLock::new();

fn node_schema() -> &'static JSONSchema {
    NODE_SCHEMA.get_or_init(|| {
        let schema_value: Value =
            serde_json::from_str(include_str!("../schema/document_node.schema.json"))
                .expect("embedded schema should parse as JSON");
        JSONSchema::options()
            .with_draft(Draft::Draft202012)
            .compile(&schema_value)
            .expect("embedded schema should compile")
    })
}

/// Validates a `serde_json::Value` against the node schema.
pub fn validate_document_value(value: &Value) -> Result<()> {
    if let Err(errors) = node_schema().validate(value) {
        let messages: Vec<String> = errors.into_iter().map(|err| err.to_string()).collect();
        let joined = messages.join("\n");
        return Err(ConvertError::corrupted(format!(
            "document failed schema validation:\n{joined}"
        )));
    }
    Ok(())
}

/// Checks what the schema cannot express: unique ids and the per-kind node
/// shapes. `Root` is accepted only as the top node.
pub fn validate_tree(root: &DocumentNode) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (index, node) in root.descendants().enumerate() {
        if !seen.insert(node.id.as_str()) {
            return Err(ConvertError::corrupted(format!("duplicate node id {}", node.id)));
        }
        check_node_shape(node, index == 0)?;
    }
    Ok(())
}

/// Parses, validates and returns a tree stored as JSON.
pub fn document_from_json(json: &str) -> Result<DocumentNode> {
    let depth = json_nesting_depth(json);
    if depth > MAX_DOCUMENT_DEPTH * JSON_LEVELS_PER_NODE + 1 {
        return Err(ConvertError::InvalidInput(format!(
            "document nests deeper than {MAX_DOCUMENT_DEPTH} nodes"
        )));
    }

    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer)
        .and_then(|value| deserializer.end().map(|()| value))
        .map_err(|err| ConvertError::InvalidInput(format!("document is not valid JSON: {err}")))?;

    validate_document_value(&value)?;
    let root = DocumentNode::deserialize(value)
        .map_err(|err| ConvertError::corrupted(format!("document has the wrong shape: {err}")))?;
    validate_tree(&root)?;
    debug!(nodes = root.node_count(), "loaded document from JSON");
    Ok(root)
}

pub fn document_to_json(root: &DocumentNode, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(root)
    } else {
        serde_json::to_string(root)
    };
    json.map_err(|err| ConvertError::corrupted(format!("document cannot be encoded: {err}")))
}

/// Validates a JSON tree and renders it.
pub fn json_to_html(json: &str, breakpoints: &BreakpointTable) -> Result<String> {
    let root = document_from_json(json)?;
    document_to_html_with(&root, breakpoints)
}

/// Maximum bracket nesting outside string literals.
fn json_nesting_depth(json: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;
    use serde_json::json;

    #[test]
    fn accepts_builder_shaped_documents() {
        let value = json!({
            "id": "r",
            "kind": "Root",
            "props": { "title": "Home" },
            "children": [
                {
                    "id": "c",
                    "kind": "Container",
                    "style": { "base": { "display": "flex" } },
                    "children": [
                        { "id": "t", "kind": "Text", "props": { "tag": "p", "text": "Hello" } },
                        { "id": "o", "kind": "OpaqueHTML", "raw_content": "<canvas></canvas>" }
                    ]
                }
            ]
        });
        let root = document_from_json(&value.to_string()).unwrap();
        assert_eq!(root.node_count(), 4);
        assert_eq!(root.find("o").map(|node| node.kind), Some(NodeKind::OpaqueHtml));
    }

    #[test]
    fn unknown_kinds_fail_schema_validation() {
        let err = document_from_json(r#"{ "id": "a", "kind": "Carousel" }"#).unwrap_err();
        assert!(matches!(err, ConvertError::SerializationFailure(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{ "id": "a", "kind": "Container", "children": [ { "id": "a", "kind": "Divider" } ] }"#;
        let err = document_from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        assert!(matches!(
            document_from_json("{ \"id\": "),
            Err(ConvertError::InvalidInput(_))
        ));
    }

    #[test]
    fn nesting_is_bounded_before_parsing() {
        let deep = "[".repeat(MAX_DOCUMENT_DEPTH * 3);
        assert!(matches!(document_from_json(&deep), Err(ConvertError::InvalidInput(_))));
        assert_eq!(json_nesting_depth(r#"{"a":"[[{"}"#), 1);
    }

    #[test]
    fn sealed_nodes_cannot_grow_props() {
        let json = r#"{ "id": "o", "kind": "OpaqueHTML", "raw_content": "<x-y></x-y>", "props": { "tag": "div" } }"#;
        assert!(matches!(
            document_from_json(json),
            Err(ConvertError::SerializationFailure(_))
        ));
    }
}
