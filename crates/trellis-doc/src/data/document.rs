use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::css::StyleRecord;

pub type NodeId = String;

/// Builder node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    Container,
    Row,
    Column,
    Grid,
    Text,
    Image,
    Link,
    Divider,
    Spacer,
    Button,
    /// Sealed markup the builder cannot represent structurally.
    #[serde(rename = "OpaqueHTML")]
    OpaqueHtml,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Root,
        NodeKind::Container,
        NodeKind::Row,
        NodeKind::Column,
        NodeKind::Grid,
        NodeKind::Text,
        NodeKind::Image,
        NodeKind::Link,
        NodeKind::Divider,
        NodeKind::Spacer,
        NodeKind::Button,
        NodeKind::OpaqueHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Container => "Container",
            NodeKind::Row => "Row",
            NodeKind::Column => "Column",
            NodeKind::Grid => "Grid",
            NodeKind::Text => "Text",
            NodeKind::Image => "Image",
            NodeKind::Link => "Link",
            NodeKind::Divider => "Divider",
            NodeKind::Spacer => "Spacer",
            NodeKind::Button => "Button",
            NodeKind::OpaqueHtml => "OpaqueHTML",
        }
    }

    /// Kinds that never carry children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Image
                | NodeKind::Divider
                | NodeKind::Spacer
                | NodeKind::Button
                | NodeKind::OpaqueHtml
        )
    }

    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            NodeKind::Container | NodeKind::Row | NodeKind::Column | NodeKind::Grid
        )
    }

    /// Property keys the builder may attach to a node of this kind.
    pub fn allowed_props(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Root => &["title", "lang", "html_attrs", "head", "class", "attrs"],
            NodeKind::Container | NodeKind::Row | NodeKind::Column | NodeKind::Grid => {
                &["tag", "class", "attrs"]
            }
            NodeKind::Text => &["tag", "text", "html", "class", "attrs"],
            NodeKind::Image => &["src", "alt", "width", "height", "class", "attrs"],
            NodeKind::Link => &["href", "text", "html", "class", "attrs"],
            NodeKind::Button => &["tag", "label", "html", "href", "class", "attrs"],
            NodeKind::Divider | NodeKind::Spacer => &["tag", "class", "attrs"],
            NodeKind::OpaqueHtml => &[],
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value. Serialized untagged so stored documents stay plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            PropValue::Map(values) => Some(values),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

/// One node of a builder document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, PropValue>,
    #[serde(default)]
    #[serde(skip_serializing_if = "StyleRecord::is_empty")]
    pub style: StyleRecord,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
    /// Verbatim sanitized markup; only present on `OpaqueHTML` nodes.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl DocumentNode {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            props: BTreeMap::new(),
            style: StyleRecord::default(),
            children: Vec::new(),
            raw_content: None,
        }
    }

    pub fn opaque(id: impl Into<NodeId>, raw: impl Into<String>) -> Self {
        let mut node = Self::new(id, NodeKind::OpaqueHtml);
        node.raw_content = Some(raw.into());
        node
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: DocumentNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_opaque(&self) -> bool {
        self.kind == NodeKind::OpaqueHtml
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(PropValue::as_str)
    }

    pub fn prop_number(&self, key: &str) -> Option<f64> {
        self.props.get(key).and_then(PropValue::as_number)
    }

    pub fn prop_list(&self, key: &str) -> Option<&[String]> {
        self.props.get(key).and_then(PropValue::as_list)
    }

    pub fn prop_map(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.props.get(key).and_then(PropValue::as_map)
    }

    /// Visible text of the subtree with all whitespace removed.
    pub fn visible_text(&self) -> String {
        crate::html::visible_text_signature(self)
    }

    /// Pre-order walk without recursion.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn node_count(&self) -> usize {
        self.descendants().count()
    }

    pub fn find(&self, id: &str) -> Option<&DocumentNode> {
        self.descendants().find(|node| node.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut DocumentNode> {
        let mut stack: Vec<&mut DocumentNode> = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter_mut());
        }
        None
    }

    /// Parent of the node with `id`, or `None` for the top node and unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&DocumentNode> {
        self.descendants()
            .find(|node| node.children.iter().any(|child| child.id == id))
    }

    /// Deepest nesting level, counting this node as 1.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        max
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a DocumentNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_with_builder_names() {
        let json = serde_json::to_string(&NodeKind::OpaqueHtml).unwrap();
        assert_eq!(json, "\"OpaqueHTML\"");
        let kind: NodeKind = serde_json::from_str("\"Container\"").unwrap();
        assert_eq!(kind, NodeKind::Container);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let node = DocumentNode::new("a", NodeKind::Divider);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "a", "kind": "Divider" }));
    }

    #[test]
    fn prop_values_keep_their_shape() {
        let json = serde_json::json!({
            "id": "t",
            "kind": "Image",
            "props": {
                "src": "a.png",
                "width": 120,
                "class": ["hero", "wide"],
                "attrs": { "loading": "lazy" }
            }
        });
        let node: DocumentNode = serde_json::from_value(json).unwrap();
        assert_eq!(node.prop_str("src"), Some("a.png"));
        assert_eq!(node.prop_number("width"), Some(120.0));
        assert_eq!(node.prop_list("class").map(<[String]>::len), Some(2));
        assert_eq!(
            node.prop_map("attrs").and_then(|m| m.get("loading")).map(String::as_str),
            Some("lazy")
        );
    }

    #[test]
    fn walks_are_preorder_and_find_parents() {
        let tree = DocumentNode::new("root", NodeKind::Root).with_child(
            DocumentNode::new("box", NodeKind::Container)
                .with_child(DocumentNode::new("a", NodeKind::Text))
                .with_child(DocumentNode::new("b", NodeKind::Text)),
        );
        let order: Vec<&str> = tree.descendants().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["root", "box", "a", "b"]);
        assert_eq!(tree.parent_of("b").map(|n| n.id.as_str()), Some("box"));
        assert_eq!(tree.depth(), 3);
        assert!(tree.parent_of("root").is_none());
    }
}
